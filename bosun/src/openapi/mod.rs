//! OpenAPI documentation for the management API.

use utoipa::OpenApi;

use crate::api::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "bosun",
        description = "Vessel-scoped bookkeeping and crew management back office",
    ),
    paths(
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::me,
        handlers::auth::change_password,
        handlers::users::list_users,
        handlers::users::create_user,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::delete_user,
        handlers::vessels::list_vessels,
        handlers::vessels::create_vessel,
        handlers::vessels::get_vessel,
        handlers::vessels::update_vessel,
        handlers::vessels::delete_vessel,
        handlers::vessels::get_settings,
        handlers::vessels::update_settings,
        handlers::members::list_members,
        handlers::members::add_member,
        handlers::members::update_member,
        handlers::members::remove_member,
        handlers::crew_positions::list_positions,
        handlers::crew_positions::create_position,
        handlers::crew_positions::get_position,
        handlers::crew_positions::update_position,
        handlers::crew_positions::delete_position,
        handlers::suppliers::list_suppliers,
        handlers::suppliers::create_supplier,
        handlers::suppliers::get_supplier,
        handlers::suppliers::update_supplier,
        handlers::suppliers::delete_supplier,
        handlers::bank_accounts::list_accounts,
        handlers::bank_accounts::create_account,
        handlers::bank_accounts::get_account,
        handlers::bank_accounts::update_account,
        handlers::bank_accounts::delete_account,
        handlers::categories::list_categories,
        handlers::categories::create_category,
        handlers::categories::get_category,
        handlers::categories::update_category,
        handlers::categories::delete_category,
        handlers::movements::list_movements,
        handlers::movements::create_movement,
        handlers::movements::create_transfer,
        handlers::movements::get_movement,
        handlers::movements::update_movement,
        handlers::movements::delete_movement,
        handlers::mareas::list_mareas,
        handlers::mareas::create_marea,
        handlers::mareas::get_marea,
        handlers::mareas::update_marea,
        handlers::mareas::delete_marea,
        handlers::mareas::close_marea,
        handlers::mareas::reopen_marea,
        handlers::mareas::get_totals,
        handlers::mareas::get_distribution,
        handlers::profiles::list_profiles,
        handlers::profiles::create_profile,
        handlers::profiles::get_profile,
        handlers::profiles::update_profile,
        handlers::profiles::delete_profile,
        handlers::profiles::list_items,
        handlers::profiles::create_item,
        handlers::profiles::update_item,
        handlers::profiles::delete_item,
        handlers::maintenance::list_maintenance,
        handlers::maintenance::create_maintenance,
        handlers::maintenance::get_maintenance,
        handlers::maintenance::update_maintenance,
        handlers::maintenance::delete_maintenance,
        handlers::reports::summary_report,
        handlers::reports::vat_report,
        handlers::reports::marea_report,
        handlers::audit::list_audit_log,
        handlers::recycle_bin::list_recycle_bin,
        handlers::recycle_bin::restore_entity,
        handlers::recycle_bin::purge_entity,
    ),
    tags(
        (name = "auth", description = "Authentication"),
        (name = "users", description = "Platform user administration"),
        (name = "vessels", description = "Vessels and settings"),
        (name = "members", description = "Vessel membership and roles"),
        (name = "crew-positions", description = "Crew position catalog"),
        (name = "suppliers", description = "Supplier registry"),
        (name = "accounts", description = "Bank accounts"),
        (name = "categories", description = "Transaction categories"),
        (name = "movements", description = "Income, expenses and transfers"),
        (name = "mareas", description = "Fishing voyages and profit distribution"),
        (name = "profiles", description = "Distribution profiles"),
        (name = "maintenance", description = "Maintenance records"),
        (name = "reports", description = "Financial and VAT reporting"),
        (name = "audit", description = "Audit trail"),
        (name = "recycle-bin", description = "Soft-deleted rows"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let json = doc.to_json().expect("OpenAPI document should serialize");
        assert!(json.contains("/api/v1/vessels/{vessel_id}/movements"));
        assert!(json.contains("/api/v1/vessels/{vessel_id}/mareas/{marea_id}/distribution"));
    }
}
