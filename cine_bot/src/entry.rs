use std::sync::Arc;

use teloxide::{dptree::deps, prelude::*, update_listeners::webhooks};

use crate::{
    backend::Backend,
    config::Config,
    database::Database,
    expiration::CHECK_PERIOD,
    handlers::{bot_commands, handle_callback_query, handle_message},
    proofs::ProofStorage,
    sessions::ChatSessions,
    web,
};

/// # Panics
///
/// Panics if the configuration is incomplete, or the database, the bot or
/// the HTTP listener can't be set up.
pub async fn entry() {
    let config = Config::from_env().expect("Failed to load the configuration!");

    let bot = Bot::new(&config.bot_token);

    bot.set_my_commands(bot_commands())
        .await
        .expect("Failed to set bot commands!");

    let database = Database::new(&config.database_url)
        .await
        .expect("Failed to open the database!");

    let backend = Backend::new(
        database,
        ProofStorage::new(&config.proofs_dir, config.proofs_public_url()),
        Arc::new(bot.clone()),
        config.bot.clone(),
    );
    let sessions = Arc::new(ChatSessions::default());

    let notifier = Arc::new(backend.expiration_notifier()).spawn(CHECK_PERIOD);

    let panel = web::router(backend.clone(), &config.proofs_dir, &config.webapp_dir);
    let tcp = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .expect("Failed to bind the HTTP listener!");

    log::info!("Creating the handler...");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback_query));

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .default_handler(|_| async {})
        .dependencies(deps![backend, sessions])
        .enable_ctrlc_handler()
        .build();

    match config.webhook_url {
        Some(url) => {
            log::info!("Receiving updates through the webhook at {url}");
            let mut options = webhooks::Options::new(config.listen_addr, url);
            if let Some(secret) = config.webhook_secret {
                options = options.secret_token(secret);
            }

            let (listener, stop_flag, webhook) = webhooks::axum_to_router(bot, options)
                .await
                .expect("Failed to set up the webhook!");

            // Both Telegram and the panel are served on the same port.
            let app = webhook.merge(panel);
            tokio::spawn(async move {
                if let Err(e) = axum::serve(tcp, app)
                    .with_graceful_shutdown(stop_flag)
                    .await
                {
                    log::error!("HTTP server failed: {e}");
                }
            });

            log::info!("Dispatching the dispatcher!");
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
        None => {
            log::info!("No webhook URL, long polling for updates.");
            let server = tokio::spawn(async move {
                if let Err(e) = axum::serve(tcp, panel).await {
                    log::error!("HTTP server failed: {e}");
                }
            });

            log::info!("Dispatching the dispatcher!");
            dispatcher.dispatch().await;
            server.abort();
        }
    }

    notifier.stop().await;
    log::info!("Shut down.");
}
