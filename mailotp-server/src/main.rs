use mailotp_common::db::{self, DbThreadPool};
use mailotp_common::email::senders::{MockSender, SmtpSender};
use mailotp_common::email::SendEmail;
use mailotp_common::service::{OtpService, OtpServiceConfig};
use mailotp_common::store::{MemoryStore, OtpStore};

use actix_web::web::Data;
use actix_web::{App, HttpServer};
use flexi_logger::{Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode};
use std::sync::Arc;
use std::time::Duration;

mod env;
mod handlers;
mod services;

use handlers::health::{HealthCheck, StoreBackend};

const MEMORY_STORE_SWEEP_FREQUENCY: Duration = Duration::from_secs(60);

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let base_addr = format!("127.0.0.1:{}", env::CONF.port);

    let _logger = Logger::try_with_str(&env::CONF.log_level)
        .expect(
            "Invalid log level. Options: ERROR, WARN, INFO, DEBUG, TRACE. \
             Example: `info, my::critical::module=trace`",
        )
        .log_to_file(FileSpec::default().directory("./logs"))
        .rotate(
            Criterion::Age(Age::Day),
            Naming::Timestamps,
            Cleanup::KeepLogAndCompressedFiles(60, 365),
        )
        .cleanup_in_background_thread(true)
        .duplicate_to_stdout(Duplicate::All)
        .write_mode(WriteMode::Async)
        .format(|writer, now, record| {
            write!(
                writer,
                "{:5} | {} | {}:{} | {}",
                record.level(),
                now.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
                record.module_path().unwrap_or("<unknown>"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .use_utc()
        .start()
        .expect("Failed to start logger");

    let actix_workers = env::CONF.actix_worker_count;

    let (otp_store, store_backend): (Arc<dyn OtpStore>, StoreBackend) = match &env::CONF.db_uri
    {
        Some(db_uri) => {
            log::info!("Connecting to database...");

            // To prevent resource starvation, max connections must be at least as large as the
            // number of actix workers
            let db_max_connections = env::CONF
                .db_max_connections
                .max(actix_workers.try_into().unwrap_or(u32::MAX));

            let db_thread_pool: DbThreadPool =
                db::create_db_thread_pool(db_uri, db_max_connections, env::CONF.db_idle_timeout);

            log::info!("Successfully connected to database");

            (
                Arc::new(db::otp::Dao::new(&db_thread_pool)) as Arc<dyn OtpStore>,
                StoreBackend::Postgres(db_thread_pool),
            )
        }
        None => {
            log::warn!("No database configured. Pending OTPs will be kept in memory.");

            let memory_store = Arc::new(MemoryStore::new());
            spawn_memory_store_sweeper(Arc::clone(&memory_store), env::CONF.otp_lifetime);

            (
                Arc::clone(&memory_store) as Arc<dyn OtpStore>,
                StoreBackend::Memory(memory_store),
            )
        }
    };

    let email_sender: Arc<dyn SendEmail> = if env::CONF.email_enabled {
        log::info!("Connecting to SMTP relay...");

        let smtp_sender = SmtpSender::with_credentials(
            &env::CONF.smtp_username,
            &env::CONF.smtp_password,
            &env::CONF.smtp_address,
            env::CONF.max_smtp_connections,
            env::CONF.smtp_idle_timeout,
        )
        .expect("Failed to connect to SMTP relay");

        match smtp_sender.test_connection().await {
            Ok(true) => (),
            Ok(false) => panic!("Failed to connect to SMTP relay"),
            Err(e) => panic!("Failed to connect to SMTP relay: {e}"),
        }

        log::info!("Successfully connected to SMTP relay");

        Arc::new(smtp_sender)
    } else {
        log::info!("Emails are disabled. Using mock sender.");
        Arc::new(MockSender::new())
    };

    let mut otp_service_config = OtpServiceConfig::new(
        env::CONF.email_from_address.clone(),
        env::CONF.email_reply_to_address.clone(),
    );
    otp_service_config.otp_lifetime = env::CONF.otp_lifetime;

    let otp_service = Data::new(OtpService::new(
        otp_store,
        email_sender,
        otp_service_config,
    ));
    let health_check = Data::new(HealthCheck::new(
        &env::CONF.health_endpoint_key,
        store_backend,
        env::CONF.email_enabled,
    ));

    log::info!("Listening on {base_addr}");

    HttpServer::new(move || {
        App::new()
            .app_data(otp_service.clone())
            .app_data(health_check.clone())
            .app_data(services::api::json_config())
            .configure(services::api::configure)
            .wrap(actix_web::middleware::Logger::default())
    })
    .workers(actix_workers)
    .bind(base_addr)?
    .run()
    .await?;

    // Safe because all the threads that use the config have been joined
    unsafe {
        env::CONF.zeroize();
    }

    Ok(())
}

/// With no database there is no job scheduler to clear out expired codes, so the server
/// sweeps its own memory store.
fn spawn_memory_store_sweeper(store: Arc<MemoryStore>, otp_lifetime: Duration) {
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(MEMORY_STORE_SWEEP_FREQUENCY);

        loop {
            interval.tick().await;

            match store.delete_all_expired(otp_lifetime) {
                Ok(0) => (),
                Ok(count) => log::info!("Cleared {count} expired OTPs from memory"),
                Err(e) => log::error!("Failed to clear expired OTPs: {e}"),
            }
        }
    });
}
