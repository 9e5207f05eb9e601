use std::{future::Future, pin::Pin, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use dropship_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    AccountApi,
    CartApi,
    FulfillmentDatabase,
    OrderFlowApi,
    SqliteDatabase,
    WalletApi,
};
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::{start_expiry_worker, ExpiryConfig},
    helpers::{json_config, path_config},
    routes::{
        health,
        AddToCartRoute,
        CartViewRoute,
        CheckoutRoute,
        CompleteOrderRoute,
        MyBalanceRoute,
        MyOrdersRoute,
        MyWalletRoute,
        OrderByIdRoute,
        PayOrderRoute,
        PendingWithdrawalsRoute,
        ProcessWithdrawalRoute,
        RemoveFromCartRoute,
        RequestWithdrawalRoute,
        ShipOrderRoute,
        SupplierWalletRoute,
        TopUpRoute,
        UpdateCartRoute,
        WalletAuditRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 64;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let mut db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.auto_migrate {
        db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Database migration failed. {e}")))?;
    }
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, create_event_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let expiry_config = ExpiryConfig {
        hold_timeout: config.hold_timeout,
        auto_complete_timeout: config.auto_complete_timeout,
        interval: config.sweep_interval,
    };
    let worker = start_expiry_worker(db.clone(), producers.clone(), expiry_config);
    let srv = create_server_instance(config, db.clone(), producers)?;
    let result = srv.await;
    info!("💻️ Server has stopped. Shutting down the expiry worker");
    worker.shutdown().await;
    if let Err(e) = db.close().await {
        warn!("🗃️ Error closing the database. {e}");
    }
    result.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// The server does not deliver notifications itself. Order events are logged so that operators can follow them.
pub fn create_event_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_paid(|ev| {
            info!("🪝️ Order #{} for user #{} was paid: {}", ev.order.id, ev.order.user_id, ev.order.total);
            Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
        })
        .on_order_annulled(|ev| {
            info!("🪝️ Order #{} for user #{} was {}", ev.order.id, ev.order.user_id, ev.status);
            Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let carts_api = CartApi::new(db.clone());
        let accounts_api = AccountApi::new(db.clone());
        let wallets_api = WalletApi::new(db.clone());
        let api_scope = web::scope("/api")
            .service(CartViewRoute::<SqliteDatabase>::new())
            .service(AddToCartRoute::<SqliteDatabase>::new())
            .service(UpdateCartRoute::<SqliteDatabase>::new())
            .service(RemoveFromCartRoute::<SqliteDatabase>::new())
            .service(CheckoutRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(PayOrderRoute::<SqliteDatabase>::new())
            .service(CompleteOrderRoute::<SqliteDatabase>::new())
            .service(MyBalanceRoute::<SqliteDatabase>::new())
            .service(MyWalletRoute::<SqliteDatabase>::new())
            .service(TopUpRoute::<SqliteDatabase>::new())
            .service(ShipOrderRoute::<SqliteDatabase>::new())
            .service(SupplierWalletRoute::<SqliteDatabase>::new())
            .service(RequestWithdrawalRoute::<SqliteDatabase>::new())
            .service(PendingWithdrawalsRoute::<SqliteDatabase>::new())
            .service(ProcessWithdrawalRoute::<SqliteDatabase>::new())
            .service(WalletAuditRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %r").log_target("dsp::access_log"))
            .app_data(json_config())
            .app_data(path_config())
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(carts_api))
            .app_data(web::Data::new(accounts_api))
            .app_data(web::Data::new(wallets_api))
            .service(health)
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
