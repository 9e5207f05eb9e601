//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpResponse, Responder};
use dropship_engine::{
    db_types::Role,
    traits::{CartApiError, CartManagement, FulfillmentDatabase, OrderManagement, WalletManagement},
    AccountApi,
    CartApi,
    OrderFlowApi,
    WalletApi,
};
use log::*;

use crate::{
    auth::AuthenticatedUser,
    data_objects::{
        AuditResponse,
        BalanceResponse,
        CartItemParams,
        CartLineParams,
        CompletionResponse,
        JsonResponse,
        PaymentResponse,
        ProcessWithdrawalParams,
        ShipOrderParams,
        TopUpParams,
        WithdrawalParams,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),*]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Cart  ----------------------------------------------------
route!(cart_view => Get "/cart" impl CartManagement where requires [Role::Dropshipper]);
/// Route handler for fetching the caller's cart.
///
/// Lines are priced at current catalog prices, so the subtotal is only indicative. The price that is actually charged
/// is fixed at checkout.
pub async fn cart_view<B: CartManagement>(
    user: AuthenticatedUser,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET cart for user #{}", user.user_id);
    let cart = api.cart(user.user_id).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(add_to_cart => Post "/cart" impl CartManagement where requires [Role::Dropshipper]);
/// Adds a product, or a variant of a product, to the caller's cart. Adding an item that is already in the cart
/// increases its quantity.
pub async fn add_to_cart<B: CartManagement>(
    user: AuthenticatedUser,
    body: web::Json<CartLineParams>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    debug!("💻️ POST cart for user #{}: {} x {}", user.user_id, params.quantity, params.item());
    let line = api.add_line(user.user_id, params.item(), params.quantity).await?;
    Ok(HttpResponse::Ok().json(line))
}

route!(update_cart => Patch "/cart" impl CartManagement where requires [Role::Dropshipper]);
/// Sets the quantity of a line in the caller's cart. A quantity of zero removes the line. Returns the updated cart.
pub async fn update_cart<B: CartManagement>(
    user: AuthenticatedUser,
    body: web::Json<CartLineParams>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    debug!("💻️ PATCH cart for user #{}: {} -> {}", user.user_id, params.item(), params.quantity);
    api.set_quantity(user.user_id, params.item(), params.quantity).await?;
    let cart = api.cart(user.user_id).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(remove_from_cart => Delete "/cart" impl CartManagement where requires [Role::Dropshipper]);
pub async fn remove_from_cart<B: CartManagement>(
    user: AuthenticatedUser,
    body: web::Json<CartItemParams>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let item = body.into_inner().item();
    debug!("💻️ DELETE {item} from cart for user #{}", user.user_id);
    if api.remove_line(user.user_id, item).await? {
        Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{item} was removed from the cart"))))
    } else {
        Err(CartApiError::LineNotFound(item).into())
    }
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/checkout" impl FulfillmentDatabase where requires [Role::Dropshipper]);
/// Route handler for the checkout endpoint
///
/// Converts the caller's cart into an order. If the caller's wallet covers the order, it is paid immediately and the
/// order is `processing`. Otherwise the order is placed `on-hold`, and can be paid later through
/// `/orders/{id}/pay`. Either way the cart is emptied.
///
/// Returns `201 Created` with `{order_id, status, total}`.
pub async fn checkout<B: FulfillmentDatabase>(
    user: AuthenticatedUser,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST checkout for user #{}", user.user_id);
    let result = api.checkout(user.user_id).await.map_err(|e| {
        debug!("💻️ Checkout failed for user #{}. {e}", user.user_id);
        e
    })?;
    Ok(HttpResponse::Created().json(result))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(my_orders => Get "/orders" impl OrderManagement);
/// Route handler for the orders endpoint
///
/// Authenticated users can fetch their own orders, newest first, using this endpoint.
pub async fn my_orders<B: OrderManagement>(
    user: AuthenticatedUser,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders for user #{}", user.user_id);
    let orders = api.orders(user.user_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{order_id}" impl OrderManagement);
/// Fetches one of the caller's orders together with its lines. Orders belonging to somebody else are reported as not
/// found.
pub async fn order_by_id<B: OrderManagement>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET order #{order_id} for user #{}", user.user_id);
    let detail = api.order_detail(user.user_id, order_id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

route!(pay_order => Post "/orders/{order_id}/pay" impl FulfillmentDatabase where requires [Role::Dropshipper]);
/// Pays for an `on-hold` order out of the caller's wallet, at the price fixed at checkout.
pub async fn pay_order<B: FulfillmentDatabase>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ POST pay for order #{order_id} by user #{}", user.user_id);
    let order = api.pay_order(user.user_id, order_id).await?;
    Ok(HttpResponse::Ok().json(PaymentResponse::from(&order)))
}

route!(complete_order => Post "/orders/{order_id}/complete" impl FulfillmentDatabase where requires [Role::Dropshipper]);
/// The buyer acknowledges receipt of a shipped order. The suppliers in the order are paid out.
pub async fn complete_order<B: FulfillmentDatabase>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ POST complete for order #{order_id} by user #{}", user.user_id);
    let (order, payouts) = api.complete_order(user.user_id, order_id).await?;
    Ok(HttpResponse::Ok().json(CompletionResponse { order, payouts }))
}

//----------------------------------------------   Wallet  ----------------------------------------------------
route!(my_balance => Get "/balance" impl WalletManagement);
pub async fn my_balance<B: WalletManagement>(
    user: AuthenticatedUser,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET balance for user #{}", user.user_id);
    let balance = api.balance(user.user_id).await?;
    Ok(HttpResponse::Ok().json(BalanceResponse { user_id: user.user_id, balance }))
}

route!(my_wallet => Get "/wallet" impl WalletManagement);
/// The caller's balance and full ledger history, newest first.
pub async fn my_wallet<B: WalletManagement>(
    user: AuthenticatedUser,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET wallet for user #{}", user.user_id);
    let statement = api.statement(user.user_id).await?;
    Ok(HttpResponse::Ok().json(statement))
}

route!(top_up => Post "/wallet/topup" impl WalletManagement where requires [Role::Dropshipper]);
pub async fn top_up<B: WalletManagement>(
    user: AuthenticatedUser,
    body: web::Json<TopUpParams>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let TopUpParams { amount, note } = body.into_inner();
    debug!("💻️ POST top-up of {amount} for user #{}", user.user_id);
    let entry = api.top_up(user.user_id, amount, note.as_deref()).await?;
    Ok(HttpResponse::Ok().json(entry))
}

//----------------------------------------------   Supplier  ----------------------------------------------------
route!(ship_order => Post "/supplier/orders/{order_id}/ship" impl FulfillmentDatabase where requires [Role::Supplier]);
/// Marks a `processing` order as shipped. Only suppliers with products in the order may ship it.
pub async fn ship_order<B: FulfillmentDatabase>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<ShipOrderParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let params = body.into_inner();
    debug!("💻️ POST ship order #{order_id} by supplier #{}", user.user_id);
    let order = api.ship_order(user.user_id, order_id, &params.tracking_ref).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(supplier_wallet => Get "/supplier/wallet" impl WalletManagement where requires [Role::Supplier]);
/// The supplier's available balance, earnings pending on shipped orders, and recent withdrawal requests.
pub async fn supplier_wallet<B: WalletManagement>(
    user: AuthenticatedUser,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET supplier wallet for user #{}", user.user_id);
    let wallet = api.supplier_wallet(user.user_id).await?;
    Ok(HttpResponse::Ok().json(wallet))
}

route!(request_withdrawal => Post "/supplier/withdrawals" impl WalletManagement where requires [Role::Supplier]);
pub async fn request_withdrawal<B: WalletManagement>(
    user: AuthenticatedUser,
    body: web::Json<WithdrawalParams>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let WithdrawalParams { amount, bank_details } = body.into_inner();
    debug!("💻️ POST withdrawal of {amount} for supplier #{}", user.user_id);
    let request = api.request_withdrawal(user.user_id, amount, &bank_details).await?;
    Ok(HttpResponse::Created().json(request))
}

//----------------------------------------------   Manager  ----------------------------------------------------
route!(pending_withdrawals => Get "/manager/withdrawals" impl WalletManagement where requires [Role::Manager]);
pub async fn pending_withdrawals<B: WalletManagement>(
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET pending withdrawals");
    let requests = api.pending_withdrawals().await?;
    Ok(HttpResponse::Ok().json(requests))
}

route!(process_withdrawal => Patch "/manager/withdrawals/{id}" impl WalletManagement where requires [Role::Manager]);
/// Approves or rejects a pending withdrawal request. Rejections must give a reason, and refund the supplier.
pub async fn process_withdrawal<B: WalletManagement>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<ProcessWithdrawalParams>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request_id = path.into_inner();
    let decision = body.into_inner().decision();
    info!("💻️ Manager #{} is processing withdrawal request #{request_id}: {decision:?}", user.user_id);
    let request = api.process_withdrawal(request_id, decision).await?;
    Ok(HttpResponse::Ok().json(request))
}

route!(wallet_audit => Get "/manager/wallets/{user_id}/audit" impl WalletManagement where requires [Role::Manager]);
/// Compares a user's balance snapshot against a full replay of their ledger.
pub async fn wallet_audit<B: WalletManagement>(
    path: web::Path<i64>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user_id = path.into_inner();
    debug!("💻️ GET wallet audit for user #{user_id}");
    let audit = AuditResponse::from(api.audit(user_id).await?);
    if !audit.consistent {
        warn!(
            "💻️ Ledger for user #{user_id} is inconsistent. Snapshot: {}, replayed: {}",
            audit.audit.snapshot, audit.audit.replayed
        );
    }
    Ok(HttpResponse::Ok().json(audit))
}
