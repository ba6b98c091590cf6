/// Integration tests for the invitation workflow
///
/// These tests require a running PostgreSQL database (see common).

mod common;

use chrono::{Duration, Utc};
use orgdesk_shared::invitations::{self, ResolveStatus};
use orgdesk_shared::mailer::MemoryMailer;
use orgdesk_shared::models::invitation::Invitation;
use orgdesk_shared::models::membership::{Membership, MembershipRole};
use orgdesk_shared::tenancy::{self, TenantScope};
use orgdesk_shared::CoreError;
use uuid::Uuid;

const APP_URL: &str = "https://orgdesk.test";

fn unique_email() -> String {
    format!("invitee-{}@example.com", Uuid::new_v4())
}

#[tokio::test]
async fn test_issue_creates_pending_invitation_and_sends_mail() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let org = common::create_org(&pool, &owner).await;
    let mailer = MemoryMailer::new();

    let email = unique_email();
    let invitation = invitations::issue(&pool, &mailer, APP_URL, org.id, &email, MembershipRole::Member)
        .await
        .unwrap();

    assert_eq!(invitation.email, email);
    assert_eq!(invitation.token.len(), invitations::TOKEN_LENGTH);
    assert!(!invitation.is_accepted());
    assert!(!invitation.is_expired(Utc::now()));

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, email);
    assert_eq!(sent[0].token(), invitation.token);
    assert!(sent[0].link.starts_with(APP_URL));
    assert_eq!(sent[0].expires_at, invitation.expires_at);
}

#[tokio::test]
async fn test_issue_rejects_duplicate_pending_invitation() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let org = common::create_org(&pool, &owner).await;
    let mailer = MemoryMailer::new();

    let email = unique_email();
    invitations::issue(&pool, &mailer, APP_URL, org.id, &email, MembershipRole::Member)
        .await
        .unwrap();

    let result = invitations::issue(&pool, &mailer, APP_URL, org.id, &email, MembershipRole::Admin).await;
    assert!(matches!(result, Err(CoreError::DuplicateInvitation)));
}

#[tokio::test]
async fn test_issue_rejects_existing_member() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let org = common::create_org(&pool, &owner).await;
    let mailer = MemoryMailer::new();

    let result =
        invitations::issue(&pool, &mailer, APP_URL, org.id, &owner.email, MembershipRole::Member).await;
    assert!(matches!(result, Err(CoreError::AlreadyMember)));
}

#[tokio::test]
async fn test_issue_rejects_owner_role_and_bad_email() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let org = common::create_org(&pool, &owner).await;
    let mailer = MemoryMailer::new();

    let result =
        invitations::issue(&pool, &mailer, APP_URL, org.id, &unique_email(), MembershipRole::Owner).await;
    assert!(matches!(result, Err(CoreError::InvalidRole(_))));

    let result =
        invitations::issue(&pool, &mailer, APP_URL, org.id, "not-an-email", MembershipRole::Member).await;
    assert!(matches!(result, Err(CoreError::InvalidInput(_))));
}

#[tokio::test]
async fn test_resolve_statuses() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let org = common::create_org(&pool, &owner).await;
    let mailer = MemoryMailer::new();

    let invitee = common::create_user(&pool, "invitee").await;
    let other = common::create_user(&pool, "other").await;

    let invitation = invitations::issue(
        &pool,
        &mailer,
        APP_URL,
        org.id,
        &invitee.email,
        MembershipRole::Member,
    )
    .await
    .unwrap();

    // Anonymous visitor.
    let r = invitations::resolve(&pool, &invitation.token, None).await.unwrap();
    assert_eq!(r.status, ResolveStatus::Pending);
    assert_eq!(r.organization_name.as_deref(), Some(org.name.as_str()));
    assert_eq!(r.email.as_deref(), Some(invitee.email.as_str()));

    // Logged in as the invited address.
    let r = invitations::resolve(&pool, &invitation.token, Some(&invitee))
        .await
        .unwrap();
    assert_eq!(r.status, ResolveStatus::LoggedInMatch);

    // Logged in as someone else.
    let r = invitations::resolve(&pool, &invitation.token, Some(&other))
        .await
        .unwrap();
    assert_eq!(r.status, ResolveStatus::LoggedInMismatch);

    // Garbage token.
    let r = invitations::resolve(&pool, "no-such-token", None).await.unwrap();
    assert_eq!(r.status, ResolveStatus::Invalid);
    assert!(r.organization_name.is_none());
}

#[tokio::test]
async fn test_accept_creates_membership_and_switches_context() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let org = common::create_org(&pool, &owner).await;
    let mailer = MemoryMailer::new();

    let invitee = common::create_user(&pool, "invitee").await;
    let invitation = invitations::issue(
        &pool,
        &mailer,
        APP_URL,
        org.id,
        &invitee.email,
        MembershipRole::Admin,
    )
    .await
    .unwrap();

    let membership = invitations::accept(&pool, &invitation.token, &invitee)
        .await
        .unwrap();
    assert_eq!(membership.role, MembershipRole::Admin);

    let scope = tenancy::resolve_scope(&pool, invitee.id).await.unwrap();
    assert_eq!(scope, TenantScope::Active(org.id));

    // The invitation is spent.
    let reloaded = Invitation::find_by_token(&pool, &invitation.token)
        .await
        .unwrap()
        .unwrap();
    assert!(reloaded.is_accepted());
}

#[tokio::test]
async fn test_accept_is_single_use() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let org = common::create_org(&pool, &owner).await;
    let mailer = MemoryMailer::new();

    let invitee = common::create_user(&pool, "invitee").await;
    let invitation = invitations::issue(
        &pool,
        &mailer,
        APP_URL,
        org.id,
        &invitee.email,
        MembershipRole::Member,
    )
    .await
    .unwrap();

    invitations::accept(&pool, &invitation.token, &invitee)
        .await
        .unwrap();

    let result = invitations::accept(&pool, &invitation.token, &invitee).await;
    assert!(matches!(result, Err(CoreError::InvalidOrExpired)));
}

#[tokio::test]
async fn test_accept_rejects_email_mismatch() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let org = common::create_org(&pool, &owner).await;
    let mailer = MemoryMailer::new();

    let other = common::create_user(&pool, "other").await;
    let invitation = invitations::issue(
        &pool,
        &mailer,
        APP_URL,
        org.id,
        &unique_email(),
        MembershipRole::Member,
    )
    .await
    .unwrap();

    let result = invitations::accept(&pool, &invitation.token, &other).await;
    assert!(matches!(result, Err(CoreError::Forbidden(id)) if id == org.id));
    assert!(!Membership::exists(&pool, org.id, other.id).await.unwrap());
}

#[tokio::test]
async fn test_accept_rejects_expired_invitation() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let org = common::create_org(&pool, &owner).await;

    let invitee = common::create_user(&pool, "invitee").await;
    let token = invitations::generate_token();
    Invitation::create(
        &pool,
        org.id,
        &invitee.email,
        &token,
        MembershipRole::Member,
        Utc::now() - Duration::hours(1),
    )
    .await
    .unwrap();

    let result = invitations::accept(&pool, &token, &invitee).await;
    assert!(matches!(result, Err(CoreError::InvalidOrExpired)));

    let r = invitations::resolve(&pool, &token, None).await.unwrap();
    assert_eq!(r.status, ResolveStatus::Invalid);
}

#[tokio::test]
async fn test_new_invitation_allowed_after_acceptance() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let org = common::create_org(&pool, &owner).await;
    let mailer = MemoryMailer::new();

    let invitee = common::create_user(&pool, "invitee").await;
    let invitation = invitations::issue(
        &pool,
        &mailer,
        APP_URL,
        org.id,
        &invitee.email,
        MembershipRole::Member,
    )
    .await
    .unwrap();
    invitations::accept(&pool, &invitation.token, &invitee)
        .await
        .unwrap();

    // The partial unique index only guards pending rows, but re-inviting
    // an accepted member is refused as AlreadyMember.
    let result = invitations::issue(
        &pool,
        &mailer,
        APP_URL,
        org.id,
        &invitee.email,
        MembershipRole::Member,
    )
    .await;
    assert!(matches!(result, Err(CoreError::AlreadyMember)));
}

#[tokio::test]
async fn test_reissue_after_expiry_supersedes_stale_row() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let org = common::create_org(&pool, &owner).await;
    let mailer = MemoryMailer::new();

    // An expired unaccepted row still occupies the partial unique index.
    let email = unique_email();
    let stale_token = invitations::generate_token();
    Invitation::create(
        &pool,
        org.id,
        &email,
        &stale_token,
        MembershipRole::Member,
        Utc::now() - Duration::hours(1),
    )
    .await
    .unwrap();

    let invitation = invitations::issue(&pool, &mailer, APP_URL, org.id, &email, MembershipRole::Member)
        .await
        .unwrap();
    assert_ne!(invitation.token, stale_token);
    assert!(!invitation.is_expired(Utc::now()));

    // The stale row was superseded, not left alongside the new one.
    assert!(Invitation::find_by_token(&pool, &stale_token)
        .await
        .unwrap()
        .is_none());
    let r = invitations::resolve(&pool, &invitation.token, None).await.unwrap();
    assert_eq!(r.status, ResolveStatus::Pending);
}

#[tokio::test]
async fn test_purge_expired_removes_only_stale_pending() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let org = common::create_org(&pool, &owner).await;

    let stale_token = invitations::generate_token();
    Invitation::create(
        &pool,
        org.id,
        &unique_email(),
        &stale_token,
        MembershipRole::Member,
        Utc::now() - Duration::days(30),
    )
    .await
    .unwrap();

    let fresh_token = invitations::generate_token();
    Invitation::create(
        &pool,
        org.id,
        &unique_email(),
        &fresh_token,
        MembershipRole::Member,
        Utc::now() + Duration::days(7),
    )
    .await
    .unwrap();

    Invitation::purge_expired_before(&pool, Utc::now()).await.unwrap();

    assert!(Invitation::find_by_token(&pool, &stale_token)
        .await
        .unwrap()
        .is_none());
    assert!(Invitation::find_by_token(&pool, &fresh_token)
        .await
        .unwrap()
        .is_some());
}
