use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;

use super::repositories::LocalRepository;
use super::repository::{CalendarRepository, RepositoryError, UserRepository};
use super::services::*;
use crate::api::*;
use crate::services::invites::{InviteMailer, InviteMessage};

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<InviteMessage>>,
}

#[async_trait]
impl InviteMailer for RecordingMailer {
    async fn send(&self, message: &InviteMessage) -> anyhow::Result<()> {
        self.sent.lock().push(message.clone());
        Ok(())
    }
}

struct FailingMailer;

#[async_trait]
impl InviteMailer for FailingMailer {
    async fn send(&self, _message: &InviteMessage) -> anyhow::Result<()> {
        anyhow::bail!("relay refused connection")
    }
}

const SETTINGS: InviteSettings<'static> = InviteSettings {
    base_url: "https://aroov.test",
    mail_from: "no-reply@aroov.test",
};

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

async fn user(repo: &LocalRepository, name: &str) -> Actor {
    let email = format!("{}@example.com", name.to_lowercase());
    let user = ensure_user(repo, &email, name, None).await.unwrap();
    Actor::from(&user)
}

async fn admin(repo: &LocalRepository) -> Actor {
    let actor = user(repo, "Admin").await;
    let update = ProfileUpdate {
        name: "Admin".to_string(),
        role: UserRole::Admin,
        university_id: None,
        budget_min: None,
        budget_max: None,
        preferred_types: vec![],
        preferred_activities: vec![],
    };
    let updated = repo.update_profile(actor.user_id, &update).await.unwrap();
    Actor::from(&updated)
}

fn destination(name: &str, kind: &str, price: i32) -> DestinationInput {
    DestinationInput {
        name: name.to_string(),
        state: Some("Chiang Mai".to_string()),
        kind: Some(kind.to_string()),
        price_min: Some(price),
        ..Default::default()
    }
}

/// A group led by Nok with Ploy as a member.
async fn group_of_two(repo: &LocalRepository) -> (Actor, Actor, GroupId) {
    let leader = user(repo, "Nok").await;
    let member = user(repo, "Ploy").await;
    let group = create_group(repo, &leader, "  Songkran trip ").await.unwrap();
    let mailer = RecordingMailer::default();
    invite_member(
        repo,
        &mailer,
        SETTINGS,
        &leader,
        group.group_id,
        "ploy@example.com",
    )
    .await
    .unwrap();
    let message = mailer.sent.lock().pop().unwrap();
    let token = message.join_url.rsplit('=').next().unwrap().to_string();
    join_group(repo, &member, &token).await.unwrap();
    (leader, member, group.group_id)
}

// ==================== Users ====================

#[tokio::test]
async fn test_ensure_user_is_find_or_create() {
    let repo = LocalRepository::new();
    let first = ensure_user(&repo, " Nok@Example.com ", "Nok", Some("p.png"))
        .await
        .unwrap();
    let again = ensure_user(&repo, "nok@example.com", "Someone else", None)
        .await
        .unwrap();

    assert_eq!(first.user_id, again.user_id);
    assert_eq!(again.name, "Nok");
    assert_eq!(again.role, UserRole::Student);
    assert_eq!(repo.user_count(), 1);

    let unnamed = ensure_user(&repo, "ploy@example.com", " ", None).await.unwrap();
    assert_eq!(unnamed.name, "ploy");

    let err = ensure_user(&repo, "not-an-email", "x", None).await.unwrap_err();
    assert!(matches!(err, RepositoryError::ValidationError { .. }));
}

#[tokio::test]
async fn test_update_profile_rules() {
    let repo = LocalRepository::new();
    let uni = repo.seed_university("Chiang Mai University");
    let actor = user(&repo, "Nok").await;

    let changes = ProfileChanges {
        name: " Nok S. ".to_string(),
        role: Some(UserRole::Student),
        university_id: Some(uni.university_id),
        budget_min: Some(1000),
        budget_max: Some(3000),
        preferred_types: vec!["beach".into(), " ".into(), "beach".into(), "city".into()],
        preferred_activities: vec![" hiking ".into()],
    };
    let updated = update_profile(&repo, &actor, &changes).await.unwrap();
    assert_eq!(updated.name, "Nok S.");
    assert_eq!(updated.university_id, Some(uni.university_id));
    assert_eq!(updated.preferred_types, vec!["beach", "city"]);
    assert_eq!(updated.preferred_activities, vec!["hiking"]);

    // Switching to general drops the university.
    let general = ProfileChanges {
        role: Some(UserRole::General),
        ..changes.clone()
    };
    let updated = update_profile(&repo, &actor, &general).await.unwrap();
    assert_eq!(updated.role, UserRole::General);
    assert_eq!(updated.university_id, None);

    let promote = ProfileChanges {
        role: Some(UserRole::Admin),
        ..changes.clone()
    };
    let err = update_profile(&repo, &actor, &promote).await.unwrap_err();
    assert!(matches!(err, RepositoryError::PermissionDenied { .. }));

    let bad_budget = ProfileChanges {
        budget_min: Some(5000),
        budget_max: Some(100),
        ..changes.clone()
    };
    let err = update_profile(&repo, &actor, &bad_budget).await.unwrap_err();
    assert!(matches!(err, RepositoryError::ValidationError { .. }));

    let unknown_uni = ProfileChanges {
        university_id: Some(UniversityId(999)),
        ..changes.clone()
    };
    let err = update_profile(&repo, &actor, &unknown_uni).await.unwrap_err();
    assert!(matches!(err, RepositoryError::ValidationError { .. }));

    let blank_name = ProfileChanges {
        name: "   ".into(),
        ..changes
    };
    assert!(update_profile(&repo, &actor, &blank_name).await.is_err());
}

#[tokio::test]
async fn test_admin_keeps_role() {
    let repo = LocalRepository::new();
    let actor = admin(&repo).await;
    let changes = ProfileChanges {
        name: "Root".into(),
        role: Some(UserRole::Student),
        ..Default::default()
    };
    let updated = update_profile(&repo, &actor, &changes).await.unwrap();
    assert_eq!(updated.role, UserRole::Admin);
}

// ==================== Calendar ====================

#[tokio::test]
async fn test_add_availability_normalizes_input() {
    let repo = LocalRepository::new();
    let actor = user(&repo, "Nok").await;

    let block = add_availability(
        &repo,
        actor.user_id,
        "2024-03-01T00:00:00.000Z",
        "2024-03-04",
        None,
    )
    .await
    .unwrap();
    assert_eq!(block.start_date, day("2024-03-01"));
    assert_eq!(block.end_date, day("2024-03-04"));
    assert_eq!(block.note, AvailabilityStatus::Available);

    let busy = add_availability(&repo, actor.user_id, "2024-03-05", "2024-03-06", Some("Busy"))
        .await
        .unwrap();
    assert!(busy.note.is_busy());

    for (start, end) in [("2024-03-04", "2024-03-04"), ("2024-03-05", "2024-03-01")] {
        let err = add_availability(&repo, actor.user_id, start, end, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
    }
    assert!(add_availability(&repo, actor.user_id, "soon", "2024-03-01", None)
        .await
        .is_err());
}

#[tokio::test]
async fn test_add_availability_rejects_oversized_block() {
    let repo = LocalRepository::new();
    let actor = user(&repo, "Nok").await;

    let err = add_availability(&repo, actor.user_id, "0001-01-01", "9999-12-31", None)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ValidationError { .. }));
    assert!(repo
        .list_availability_for_user(actor.user_id)
        .await
        .unwrap()
        .is_empty());

    let year = add_availability(&repo, actor.user_id, "2024-01-01", "2025-01-01", None)
        .await
        .unwrap();
    assert_eq!(year.end_date, day("2025-01-01"));
}

#[tokio::test]
async fn test_delete_availability_only_own_blocks() {
    let repo = LocalRepository::new();
    let nok = user(&repo, "Nok").await;
    let ploy = user(&repo, "Ploy").await;
    let block = add_availability(&repo, nok.user_id, "2024-03-01", "2024-03-02", None)
        .await
        .unwrap();

    let err = delete_availability(&repo, ploy.user_id, block.id)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::PermissionDenied { .. }));

    delete_availability(&repo, nok.user_id, block.id).await.unwrap();
    assert!(delete_availability(&repo, nok.user_id, block.id).await.is_err());
}

#[tokio::test]
async fn test_user_calendar_appends_university_schedule() {
    let repo = LocalRepository::new();
    let uni = repo.seed_university("Chulalongkorn University");
    repo.add_university_event(&NewUniversityEvent {
        university_id: uni.university_id,
        start_date: day("2024-05-01"),
        end_date: day("2024-05-10"),
        category: "exam".into(),
        label: "Finals".into(),
    })
    .await
    .unwrap();

    let actor = user(&repo, "Nok").await;
    update_profile(
        &repo,
        &actor,
        &ProfileChanges {
            name: "Nok".into(),
            university_id: Some(uni.university_id),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    add_availability(&repo, actor.user_id, "2024-04-01", "2024-04-03", None)
        .await
        .unwrap();

    let feed = user_calendar(&repo, actor.user_id).await.unwrap();
    assert_eq!(feed.len(), 2);
    assert_eq!(feed[0].title, "Available");
    assert_eq!(feed[1].id, "uni-0");
    assert_eq!(feed[1].title, "exam: Finals");
}

// ==================== Catalog ====================

#[tokio::test]
async fn test_save_destination_requires_admin_and_upserts() {
    let repo = LocalRepository::new();
    let student = user(&repo, "Nok").await;
    let root = admin(&repo).await;

    let err = save_destination(&repo, &student, &destination("Doi Suthep", "temple", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::PermissionDenied { .. }));

    let created = save_destination(&repo, &root, &destination("Doi Suthep", "temple", 0))
        .await
        .unwrap();
    let mut edit = destination("Wat Phra That Doi Suthep", "temple", 30);
    edit.dest_id = Some(created.dest_id);
    let updated = save_destination(&repo, &root, &edit).await.unwrap();
    assert_eq!(updated.dest_id, created.dest_id);
    assert_eq!(updated.price_min, Some(30));
    assert_eq!(repo.destination_count(), 1);

    let mut bad = destination("X", "beach", 500);
    bad.price_max = Some(100);
    assert!(save_destination(&repo, &root, &bad).await.is_err());
    assert!(save_destination(&repo, &root, &destination(" ", "beach", 1))
        .await
        .is_err());

    let err = delete_destination(&repo, &student, created.dest_id)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::PermissionDenied { .. }));
    delete_destination(&repo, &root, created.dest_id).await.unwrap();
    assert_eq!(repo.destination_count(), 0);
}

#[tokio::test]
async fn test_favourites_are_idempotent() {
    let repo = LocalRepository::new();
    let actor = user(&repo, "Nok").await;
    let dest = repo.seed_destination(destination("Pai", "mountain", 800));

    assert!(add_favourite(&repo, actor.user_id, dest.dest_id).await.unwrap());
    assert!(!add_favourite(&repo, actor.user_id, dest.dest_id).await.unwrap());
    assert_eq!(list_favourites(&repo, actor.user_id).await.unwrap().len(), 1);

    let page = list_destinations(&repo, &DestinationQuery::default(), Some(actor.user_id))
        .await
        .unwrap();
    assert!(page.data[0].is_liked);

    assert!(remove_favourite(&repo, actor.user_id, dest.dest_id).await.unwrap());
    assert!(list_favourites(&repo, actor.user_id).await.unwrap().is_empty());
}

// ==================== Groups ====================

#[tokio::test]
async fn test_group_lifecycle_and_permissions() {
    let repo = LocalRepository::new();
    let (leader, member, group_id) = group_of_two(&repo).await;
    let outsider = user(&repo, "Mali").await;

    let detail = group_detail(&repo, &member, group_id).await.unwrap();
    assert_eq!(detail.group_name, "Songkran trip");
    assert_eq!(detail.current_user_role, GroupRole::Member);
    assert_eq!(detail.members.len(), 2);
    assert_eq!(detail.members[0].role, GroupRole::Leader);
    assert!(detail.invites.is_empty());

    let err = group_detail(&repo, &outsider, group_id).await.unwrap_err();
    assert!(matches!(err, RepositoryError::PermissionDenied { .. }));

    let err = rename_group(&repo, &member, group_id, "Mine now").await.unwrap_err();
    assert!(matches!(err, RepositoryError::PermissionDenied { .. }));
    rename_group(&repo, &leader, group_id, "Loy Krathong").await.unwrap();

    let groups = list_groups(&repo, member.user_id).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].group_name, "Loy Krathong");
    assert_eq!(groups[0].member_count, 2);

    assert!(delete_group(&repo, &member, group_id).await.is_err());
    delete_group(&repo, &leader, group_id).await.unwrap();
    assert!(list_groups(&repo, member.user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_group_requires_name() {
    let repo = LocalRepository::new();
    let actor = user(&repo, "Nok").await;
    let err = create_group(&repo, &actor, "   ").await.unwrap_err();
    assert!(matches!(err, RepositoryError::ValidationError { .. }));
}

#[tokio::test]
async fn test_invite_message_and_join() {
    let repo = LocalRepository::new();
    let leader = user(&repo, "Nok").await;
    let friend = user(&repo, "Ploy").await;
    let group = create_group(&repo, &leader, "Krabi").await.unwrap();
    let mailer = RecordingMailer::default();

    let invite = invite_member(
        &repo,
        &mailer,
        SETTINGS,
        &leader,
        group.group_id,
        " Ploy@Example.com ",
    )
    .await
    .unwrap();
    assert_eq!(invite.email, "ploy@example.com");
    assert_eq!(invite.status, InviteStatus::Pending);

    let sent = mailer.sent.lock().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Nok invited you to join \"Krabi\"!");
    assert_eq!(
        sent[0].join_url,
        format!("https://aroov.test/api/join?token={}", invite.token)
    );
    assert_eq!(sent[0].from, "no-reply@aroov.test");

    let joined = join_group(&repo, &friend, &invite.token).await.unwrap();
    assert_eq!(joined, group.group_id);
    // The token is spent once accepted.
    let err = join_group(&repo, &friend, &invite.token).await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));

    let err = invite_member(&repo, &mailer, SETTINGS, &leader, group.group_id, "nobody")
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ValidationError { .. }));
}

#[tokio::test]
async fn test_join_is_idempotent_for_existing_members() {
    let repo = LocalRepository::new();
    let (leader, member, group_id) = group_of_two(&repo).await;
    let mailer = RecordingMailer::default();
    let invite = invite_member(&repo, &mailer, SETTINGS, &leader, group_id, "ploy@example.com")
        .await
        .unwrap();

    join_group(&repo, &member, &invite.token).await.unwrap();
    let detail = group_detail(&repo, &leader, group_id).await.unwrap();
    assert_eq!(detail.members.len(), 2);
}

#[tokio::test]
async fn test_invite_reports_delivery_failure() {
    let repo = LocalRepository::new();
    let leader = user(&repo, "Nok").await;
    let group = create_group(&repo, &leader, "Krabi").await.unwrap();

    let err = invite_member(
        &repo,
        &FailingMailer,
        SETTINGS,
        &leader,
        group.group_id,
        "ploy@example.com",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RepositoryError::InternalError { .. }));
}

#[tokio::test]
async fn test_trips_votes_and_removal() {
    let repo = LocalRepository::new();
    let (leader, member, group_id) = group_of_two(&repo).await;
    let pai = repo.seed_destination(destination("Pai", "mountain", 800));
    let krabi = repo.seed_destination(destination("Krabi", "beach", 1500));

    let first = share_trip(&repo, &member, group_id, pai.dest_id).await.unwrap();
    let second = share_trip(&repo, &leader, group_id, krabi.dest_id).await.unwrap();
    let err = share_trip(&repo, &leader, group_id, pai.dest_id).await.unwrap_err();
    assert!(matches!(err, RepositoryError::ValidationError { .. }));

    assert_eq!(
        toggle_vote(&repo, &leader, second.trip_ref_id).await.unwrap(),
        VoteAction::Added
    );
    assert_eq!(
        toggle_vote(&repo, &member, second.trip_ref_id).await.unwrap(),
        VoteAction::Added
    );
    assert_eq!(
        toggle_vote(&repo, &member, second.trip_ref_id).await.unwrap(),
        VoteAction::Removed
    );

    let trips = list_trips(&repo, &leader, group_id).await.unwrap();
    assert_eq!(trips.len(), 2);
    assert_eq!(trips[0].trip_ref_id, second.trip_ref_id);
    assert_eq!(trips[0].vote_count, 1);
    assert!(trips[0].user_has_voted);
    assert_eq!(trips[1].shared_by, "Ploy");

    // A member may not remove someone else's trip; the leader may.
    let err = remove_trip(&repo, &member, group_id, second.trip_ref_id)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::PermissionDenied { .. }));
    remove_trip(&repo, &member, group_id, first.trip_ref_id).await.unwrap();
    remove_trip(&repo, &leader, group_id, second.trip_ref_id).await.unwrap();
    assert!(list_trips(&repo, &leader, group_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_outsider_cannot_vote() {
    let repo = LocalRepository::new();
    let (leader, _, group_id) = group_of_two(&repo).await;
    let outsider = user(&repo, "Mali").await;
    let pai = repo.seed_destination(destination("Pai", "mountain", 800));
    let trip = share_trip(&repo, &leader, group_id, pai.dest_id).await.unwrap();

    let err = toggle_vote(&repo, &outsider, trip.trip_ref_id).await.unwrap_err();
    assert!(matches!(err, RepositoryError::PermissionDenied { .. }));
    let err = toggle_vote(&repo, &leader, TripRefId(9999)).await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));
}

// ==================== Group calendar ====================

#[tokio::test]
async fn test_group_best_dates_counts_blocks_not_members() {
    let repo = LocalRepository::new();
    let (leader, _, group_id) = group_of_two(&repo).await;

    add_availability(&repo, leader.user_id, "2024-06-01", "2024-06-04", None)
        .await
        .unwrap();
    add_availability(&repo, leader.user_id, "2024-06-02", "2024-06-03", Some("Free"))
        .await
        .unwrap();

    let rec = group_best_dates(&repo, &leader, group_id).await.unwrap();
    assert_eq!(rec.best_day_count, 2);
    assert_eq!(rec.best_days, vec![day("2024-06-02")]);
}

#[tokio::test]
async fn test_group_best_dates_over_member_blocks() {
    let repo = LocalRepository::new();
    let (leader, member, group_id) = group_of_two(&repo).await;
    let outsider = user(&repo, "Mali").await;

    add_availability(&repo, leader.user_id, "2024-04-10", "2024-04-14", None)
        .await
        .unwrap();
    add_availability(&repo, member.user_id, "2024-04-12", "2024-04-16", None)
        .await
        .unwrap();
    add_availability(&repo, member.user_id, "2024-04-13", "2024-04-14", Some("Busy"))
        .await
        .unwrap();
    // Blocks of non-members never count.
    add_availability(&repo, outsider.user_id, "2024-04-10", "2024-04-11", None)
        .await
        .unwrap();

    let rec = group_best_dates(&repo, &leader, group_id).await.unwrap();
    assert_eq!(rec.best_day_count, 2);
    assert_eq!(rec.best_days, vec![day("2024-04-12"), day("2024-04-13")]);

    let feed = group_calendar(&repo, &member, group_id).await.unwrap();
    assert_eq!(feed.len(), 3);
    assert!(feed.iter().any(|e| e.title == "Nok: Available"));
    assert!(feed.iter().any(|e| e.title == "Ploy: Busy"));

    assert!(group_best_dates(&repo, &outsider, group_id).await.is_err());
}

#[tokio::test]
async fn test_group_recommendations_use_member_preferences() {
    let repo = LocalRepository::new();
    let (leader, member, group_id) = group_of_two(&repo).await;
    repo.seed_destination(destination("Doi Inthanon", "mountain", 500));
    let beach = repo.seed_destination(destination("Railay", "beach", 900));

    update_profile(
        &repo,
        &member,
        &ProfileChanges {
            name: "Ploy".into(),
            budget_max: Some(1000),
            preferred_types: vec!["Beach".into()],
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let ranked = group_recommendations(&repo, &leader, group_id).await.unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].destination.dest_id, beach.dest_id);
    assert!(ranked[0].similarity > ranked[1].similarity);
}

#[tokio::test]
async fn test_services_accept_trait_objects() {
    let repo = LocalRepository::new();
    let dyn_repo: &dyn super::repository::FullRepository = &repo;
    assert!(health_check(dyn_repo).await.unwrap());
    repo.set_healthy(false);
    assert!(!health_check(dyn_repo).await.unwrap());
    assert!(list_universities(dyn_repo).await.is_err());
}
