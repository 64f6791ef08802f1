use mailotp_common::db::DbThreadPool;
use mailotp_common::otp::Otp;
use mailotp_common::store::MemoryStore;

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub enum StoreBackend {
    Postgres(DbThreadPool),
    Memory(Arc<MemoryStore>),
}

pub struct HealthCheck {
    key: String,
    backend: StoreBackend,
    email_enabled: bool,
}

impl HealthCheck {
    pub fn new(key: &str, backend: StoreBackend, email_enabled: bool) -> Self {
        Self {
            key: String::from(key),
            backend,
            email_enabled,
        }
    }
}

#[derive(Deserialize)]
pub struct HealthKeyQuery {
    pub key: Option<String>,
}

pub async fn heartbeat() -> impl Responder {
    HttpResponse::Ok()
}

pub async fn health(
    health_check: web::Data<HealthCheck>,
    query: web::Query<HealthKeyQuery>,
) -> impl Responder {
    let Some(key) = query.key.as_deref() else {
        return HttpResponse::Unauthorized().finish();
    };

    if key.is_empty() || !Otp::are_equal(key, &health_check.key) {
        return HttpResponse::Unauthorized().finish();
    }

    let mut resp_body = match &health_check.backend {
        StoreBackend::Postgres(db_thread_pool) => {
            let pool_state = db_thread_pool.state();
            json!({
                "db_thread_pool_state": {
                    "connections": pool_state.connections,
                    "idle_connections": pool_state.idle_connections
                }
            })
        }
        StoreBackend::Memory(store) => match store.len() {
            Ok(pending_otps) => json!({
                "memory_store_state": {
                    "pending_otps": pending_otps
                }
            }),
            Err(e) => {
                log::error!("{e}");
                return HttpResponse::InternalServerError().json(json!({
                    "memory_store_state": {
                        "error": e.to_string()
                    }
                }));
            }
        },
    };

    resp_body["email_enabled"] = json!(health_check.email_enabled);

    HttpResponse::Ok().json(resp_body)
}
