/// Integration tests for membership management
///
/// These tests require a running PostgreSQL database (see common).

mod common;

use orgdesk_shared::mailer::MemoryMailer;
use orgdesk_shared::members::{self, AttachOutcome};
use orgdesk_shared::models::membership::{Membership, MembershipRole};
use orgdesk_shared::models::user::User;
use orgdesk_shared::tenancy::{self, TenantScope};
use orgdesk_shared::CoreError;
use uuid::Uuid;

const APP_URL: &str = "https://orgdesk.test";

#[tokio::test]
async fn test_invite_or_attach_attaches_existing_user_directly() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let joiner = common::create_user(&pool, "joiner").await;
    let org = common::create_org(&pool, &owner).await;
    let mailer = MemoryMailer::new();

    let outcome = members::invite_or_attach(
        &pool,
        &mailer,
        APP_URL,
        org.id,
        &joiner.email,
        MembershipRole::Admin,
    )
    .await
    .unwrap();

    // An existing account becomes a member in one step, no email.
    match outcome {
        AttachOutcome::Attached { membership } => {
            assert_eq!(membership.user_id, joiner.id);
            assert_eq!(membership.role, MembershipRole::Admin);
        }
        AttachOutcome::Invited { .. } => panic!("expected direct attach"),
    }
    assert!(Membership::exists(&pool, org.id, joiner.id).await.unwrap());
    assert!(mailer.sent().is_empty());

    // The new member's active organization is untouched; they switch in
    // themselves.
    let scope = tenancy::resolve_scope(&pool, joiner.id).await.unwrap();
    assert_eq!(scope, TenantScope::None);

    let result = members::invite_or_attach(
        &pool,
        &mailer,
        APP_URL,
        org.id,
        &joiner.email,
        MembershipRole::Member,
    )
    .await;
    assert!(matches!(result, Err(CoreError::AlreadyMember)));
}

#[tokio::test]
async fn test_invite_or_attach_invites_unknown_email() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let org = common::create_org(&pool, &owner).await;
    let mailer = MemoryMailer::new();

    let email = format!("newhire-{}@example.com", Uuid::new_v4());
    let outcome =
        members::invite_or_attach(&pool, &mailer, APP_URL, org.id, &email, MembershipRole::Member)
            .await
            .unwrap();

    match outcome {
        AttachOutcome::Invited { invitation } => {
            assert_eq!(invitation.email, email);
            assert!(!invitation.is_accepted());
        }
        AttachOutcome::Attached { .. } => panic!("expected invitation"),
    }
    assert_eq!(mailer.sent().len(), 1);
}

#[tokio::test]
async fn test_invite_or_attach_rejects_owner_role_and_missing_org() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let joiner = common::create_user(&pool, "joiner").await;
    let org = common::create_org(&pool, &owner).await;
    let mailer = MemoryMailer::new();

    let result = members::invite_or_attach(
        &pool,
        &mailer,
        APP_URL,
        org.id,
        &joiner.email,
        MembershipRole::Owner,
    )
    .await;
    assert!(matches!(result, Err(CoreError::InvalidRole(_))));

    let result = members::invite_or_attach(
        &pool,
        &mailer,
        APP_URL,
        Uuid::new_v4(),
        &joiner.email,
        MembershipRole::Member,
    )
    .await;
    assert!(matches!(result, Err(CoreError::NotFound)));
}

#[tokio::test]
async fn test_change_role_promotes_and_demotes() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let member = common::create_user(&pool, "member").await;
    let org = common::create_org(&pool, &owner).await;

    Membership::create(&pool, org.id, member.id, MembershipRole::Member)
        .await
        .unwrap();

    let updated = members::change_role(&pool, org.id, member.id, MembershipRole::Admin)
        .await
        .unwrap();
    assert_eq!(updated.role, MembershipRole::Admin);

    let updated = members::change_role(&pool, org.id, member.id, MembershipRole::Member)
        .await
        .unwrap();
    assert_eq!(updated.role, MembershipRole::Member);
}

#[tokio::test]
async fn test_change_role_is_idempotent() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let member = common::create_user(&pool, "member").await;
    let org = common::create_org(&pool, &owner).await;

    Membership::create(&pool, org.id, member.id, MembershipRole::Admin)
        .await
        .unwrap();

    let updated = members::change_role(&pool, org.id, member.id, MembershipRole::Admin)
        .await
        .unwrap();
    assert_eq!(updated.role, MembershipRole::Admin);
}

#[tokio::test]
async fn test_change_role_rejects_owner_role() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let member = common::create_user(&pool, "member").await;
    let org = common::create_org(&pool, &owner).await;

    Membership::create(&pool, org.id, member.id, MembershipRole::Member)
        .await
        .unwrap();

    let result = members::change_role(&pool, org.id, member.id, MembershipRole::Owner).await;
    assert!(matches!(result, Err(CoreError::InvalidRole(_))));
}

#[tokio::test]
async fn test_change_role_of_owner_is_refused() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let org = common::create_org(&pool, &owner).await;

    let result = members::change_role(&pool, org.id, owner.id, MembershipRole::Member).await;
    assert!(matches!(result, Err(CoreError::InvalidInput(_))));

    // Unchanged.
    let role = Membership::get_role(&pool, org.id, owner.id).await.unwrap();
    assert_eq!(role, Some(MembershipRole::Owner));
}

#[tokio::test]
async fn test_change_role_of_non_member_is_not_member() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let org = common::create_org(&pool, &owner).await;

    let result = members::change_role(&pool, org.id, Uuid::new_v4(), MembershipRole::Admin).await;
    assert!(matches!(result, Err(CoreError::NotMember)));
}

#[tokio::test]
async fn test_remove_member_clears_active_pointer() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let member = common::create_user(&pool, "member").await;
    let org = common::create_org(&pool, &owner).await;

    Membership::create(&pool, org.id, member.id, MembershipRole::Member)
        .await
        .unwrap();
    tenancy::switch_organization(&pool, member.id, org.id)
        .await
        .unwrap();

    members::remove_member(&pool, org.id, member.id).await.unwrap();

    assert!(!Membership::exists(&pool, org.id, member.id).await.unwrap());
    let reloaded = User::find_by_id(&pool, member.id).await.unwrap().unwrap();
    assert_eq!(reloaded.current_organization_id, None);
}

#[tokio::test]
async fn test_remove_member_keeps_pointer_at_other_org() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let member = common::create_user(&pool, "member").await;
    let org_a = common::create_org(&pool, &owner).await;
    let org_b = common::create_org(&pool, &owner).await;

    Membership::create(&pool, org_a.id, member.id, MembershipRole::Member)
        .await
        .unwrap();
    Membership::create(&pool, org_b.id, member.id, MembershipRole::Member)
        .await
        .unwrap();
    tenancy::switch_organization(&pool, member.id, org_b.id)
        .await
        .unwrap();

    // Removed from org_a while active in org_b: the pointer survives.
    members::remove_member(&pool, org_a.id, member.id)
        .await
        .unwrap();

    let scope = tenancy::resolve_scope(&pool, member.id).await.unwrap();
    assert_eq!(scope, TenantScope::Active(org_b.id));
}

#[tokio::test]
async fn test_remove_owner_is_refused() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let org = common::create_org(&pool, &owner).await;

    let result = members::remove_member(&pool, org.id, owner.id).await;
    assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    assert!(Membership::exists(&pool, org.id, owner.id).await.unwrap());
}

#[tokio::test]
async fn test_remove_non_member_is_not_member() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let org = common::create_org(&pool, &owner).await;

    let result = members::remove_member(&pool, org.id, Uuid::new_v4()).await;
    assert!(matches!(result, Err(CoreError::NotMember)));
}

#[tokio::test]
async fn test_list_members_joins_identity() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let member = common::create_user(&pool, "member").await;
    let org = common::create_org(&pool, &owner).await;

    Membership::create(&pool, org.id, member.id, MembershipRole::Admin)
        .await
        .unwrap();

    let members = Membership::list_members(&pool, org.id).await.unwrap();
    assert_eq!(members.len(), 2);

    let row = members.iter().find(|m| m.user_id == member.id).unwrap();
    assert_eq!(row.email, member.email);
    assert_eq!(row.role, MembershipRole::Admin);
}
