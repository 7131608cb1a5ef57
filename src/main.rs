// ==========================================
// MRP 订单系统 - 命令行入口
// ==========================================
// 职责: 打开数据库并输出订单概况
// 用法: mrp-orders [db_path]
// ==========================================

use mrp_orders::app::{get_default_db_path, AppState};
use mrp_orders::{BuildStatus, PurchaseOrderStatus, SalesOrderStatus};

fn main() -> anyhow::Result<()> {
    mrp_orders::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", mrp_orders::APP_NAME, mrp_orders::VERSION);
    tracing::info!("==================================================");

    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;
    let today = chrono::Local::now().date_naive();

    let open_pos = state
        .purchase_order_api
        .list_orders(Some(&PurchaseOrderStatus::OPEN))?;
    let overdue_pos = state.purchase_order_api.list_overdue(today)?;
    tracing::info!(
        open = open_pos.len(),
        overdue = overdue_pos.len(),
        "采购订单"
    );

    let open_sos = state
        .sales_order_api
        .list_orders(Some(&SalesOrderStatus::OPEN))?;
    let overdue_sos = state.sales_order_api.list_overdue(today)?;
    tracing::info!(
        open = open_sos.len(),
        overdue = overdue_sos.len(),
        "销售订单"
    );

    let active_builds = state.build_api.list_builds(Some(&BuildStatus::ACTIVE))?;
    let overdue_builds = state.build_api.list_overdue(today)?;
    tracing::info!(
        active = active_builds.len(),
        overdue = overdue_builds.len(),
        "生产订单"
    );

    for po in overdue_pos {
        tracing::warn!(reference = %po.reference, target_date = ?po.target_date, "采购订单逾期");
    }
    for so in overdue_sos {
        tracing::warn!(reference = %so.reference, target_date = ?so.target_date, "销售订单逾期");
    }
    for build in overdue_builds {
        tracing::warn!(reference = %build.reference, target_date = ?build.target_date, "生产订单逾期");
    }

    Ok(())
}
