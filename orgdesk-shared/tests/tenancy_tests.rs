/// Integration tests for tenancy resolution and organization lifecycle
///
/// These tests require a running PostgreSQL database (see common).

mod common;

use orgdesk_shared::models::membership::{Membership, MembershipRole};
use orgdesk_shared::models::organization::Organization;
use orgdesk_shared::models::user::User;
use orgdesk_shared::tenancy::{self, TenantScope};
use orgdesk_shared::CoreError;
use uuid::Uuid;

#[tokio::test]
async fn test_fresh_user_resolves_to_no_scope() {
    let pool = common::setup_pool().await;
    let user = common::create_user(&pool, "fresh").await;

    let scope = tenancy::resolve_scope(&pool, user.id).await.unwrap();
    assert_eq!(scope, TenantScope::None);
}

#[tokio::test]
async fn test_resolve_unknown_user_is_not_found() {
    let pool = common::setup_pool().await;

    let result = tenancy::resolve_scope(&pool, Uuid::new_v4()).await;
    assert!(matches!(result, Err(CoreError::NotFound)));
}

#[tokio::test]
async fn test_create_organization_installs_owner_and_switches() {
    let pool = common::setup_pool().await;
    let user = common::create_user(&pool, "creator").await;

    let org = common::create_org(&pool, &user).await;

    let role = Membership::get_role(&pool, org.id, user.id).await.unwrap();
    assert_eq!(role, Some(MembershipRole::Owner));

    let scope = tenancy::resolve_scope(&pool, user.id).await.unwrap();
    assert_eq!(scope, TenantScope::Active(org.id));
}

#[tokio::test]
async fn test_duplicate_organization_name_is_rejected() {
    let pool = common::setup_pool().await;
    let user = common::create_user(&pool, "dup").await;

    let name = format!("Org {}", Uuid::new_v4());
    tenancy::create_organization(&pool, user.id, &name)
        .await
        .unwrap();

    let result = tenancy::create_organization(&pool, user.id, &name).await;
    assert!(matches!(result, Err(CoreError::InvalidInput(_))));
}

#[tokio::test]
async fn test_switch_requires_membership() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let outsider = common::create_user(&pool, "outsider").await;
    let org = common::create_org(&pool, &owner).await;

    let result = tenancy::switch_organization(&pool, outsider.id, org.id).await;
    assert!(matches!(result, Err(CoreError::Forbidden(id)) if id == org.id));

    // The outsider's pointer is untouched.
    let scope = tenancy::resolve_scope(&pool, outsider.id).await.unwrap();
    assert_eq!(scope, TenantScope::None);
}

#[tokio::test]
async fn test_switch_between_organizations() {
    let pool = common::setup_pool().await;
    let user = common::create_user(&pool, "switcher").await;
    let org_a = common::create_org(&pool, &user).await;
    let org_b = common::create_org(&pool, &user).await;

    // Creating org_b switched to it; switch back.
    assert_eq!(
        tenancy::resolve_scope(&pool, user.id).await.unwrap(),
        TenantScope::Active(org_b.id)
    );

    tenancy::switch_organization(&pool, user.id, org_a.id)
        .await
        .unwrap();
    assert_eq!(
        tenancy::resolve_scope(&pool, user.id).await.unwrap(),
        TenantScope::Active(org_a.id)
    );
}

#[tokio::test]
async fn test_stale_pointer_self_heals() {
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

    // Revoke the membership behind the pointer's back.
    Membership::delete(&pool, org.id, member.id).await.unwrap();

    let scope = tenancy::resolve_scope(&pool, member.id).await.unwrap();
    assert_eq!(scope, TenantScope::None);

    // The pointer was cleared, not just ignored.
    let reloaded = User::find_by_id(&pool, member.id).await.unwrap().unwrap();
    assert_eq!(reloaded.current_organization_id, None);
}

#[tokio::test]
async fn test_delete_organization_cascades_and_clears_pointers() {
    let pool = common::setup_pool().await;
    let owner = common::create_user(&pool, "owner").await;
    let org = common::create_org(&pool, &owner).await;

    tenancy::delete_organization(&pool, org.id).await.unwrap();

    assert!(Organization::find_by_id(&pool, org.id)
        .await
        .unwrap()
        .is_none());
    assert!(!Membership::exists(&pool, org.id, owner.id).await.unwrap());

    // The owner survives with no active organization.
    let reloaded = User::find_by_id(&pool, owner.id).await.unwrap().unwrap();
    assert_eq!(reloaded.current_organization_id, None);

    // Deleting again is NotFound.
    let result = tenancy::delete_organization(&pool, org.id).await;
    assert!(matches!(result, Err(CoreError::NotFound)));
}
