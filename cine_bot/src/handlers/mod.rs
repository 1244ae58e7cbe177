mod callbacks;
mod menus;

use std::sync::Arc;

use bot_commons::useful_methods::{BotStuff, MessageStuff};
use teloxide::{
    prelude::*,
    sugar::request::RequestReplyExt,
    types::{
        BotCommand, CallbackQuery, ChatId, Me, Message, MessageId, MessageOrigin, ParseMode, UserId,
    },
    ApiError, RequestError,
};

use crate::{
    backend::Backend,
    catalog::{pagination::Page, Catalog, CHAT_SEARCH_LIMIT},
    error::Error,
    sessions::ChatSessions,
};
use callbacks::CallbackData;
use menus::Menu;

pub fn bot_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("start", "Main menu and plans"),
        BotCommand::new("menu", "Main menu"),
        BotCommand::new("help", "How this bot works"),
    ]
}

/// What to tell a chat user when an operation fails.
fn error_reply(error: &Error) -> String {
    match error {
        Error::Validation(message)
        | Error::Conflict(message)
        | Error::Rejected { message, .. } => format!("⚠️ {message}"),
        Error::Unauthorized => "⛔ Not authorized.".to_string(),
        Error::SubscriptionInactive => {
            "⚠️ You don't have an active subscription. Use /start to see the plans.".to_string()
        }
        Error::NotFound(what) => format!("❌ The {what} was not found."),
        e => {
            log::error!("Upstream failure while handling a chat update: {e}");
            "❌ Something went wrong on our side. Please try again later.".to_string()
        }
    }
}

async fn send_menu(bot: &Bot, chat: ChatId, (text, keyboard): Menu) -> Result<(), RequestError> {
    bot.send_message(chat, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

async fn reply(bot: &Bot, message: &Message, text: impl Into<String>) -> Result<(), RequestError> {
    bot.send_message(message.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_to(message.id)
        .await?;
    Ok(())
}

/// The ID of the post in `channel` that `message` is, or is a forward of.
fn channel_post_id(message: &Message, channel: ChatId) -> Option<MessageId> {
    if message.chat.id == channel {
        return Some(message.id);
    }
    match message.forward_origin()? {
        MessageOrigin::Channel {
            chat, message_id, ..
        } if chat.id == channel => Some(*message_id),
        _ => None,
    }
}

pub async fn handle_message(
    bot: Bot,
    me: Me,
    message: Message,
    backend: Arc<Backend>,
    sessions: Arc<ChatSessions>,
) -> Result<(), RequestError> {
    if handle_command(&bot, &me, &message, &backend).await? {
        return Ok(());
    }

    // Everything else only makes sense in a private chat with the bot.
    if !message.chat.is_private() {
        return Ok(());
    }
    let Some(user) = &message.from else {
        return Ok(());
    };

    if message.find_biggest_photo().is_some() {
        return handle_payment_photo(&bot, &message, user.id, &backend, &sessions).await;
    }

    if let Some(text) = message.text() {
        return handle_search(&bot, &message, user.id, text, &backend, &sessions).await;
    }

    Ok(())
}

/// Returns `true` if a command was parsed and responded to.
async fn handle_command(
    bot: &Bot,
    me: &Me,
    message: &Message,
    backend: &Backend,
) -> Result<bool, RequestError> {
    let Some(text) = message.text() else {
        return Ok(false);
    };
    if !text.starts_with('/') {
        return Ok(false);
    }
    let Some(command) = text.split_whitespace().next() else {
        return Ok(false);
    };
    let Some(user) = &message.from else {
        return Ok(false);
    };

    let command_full_len = command.len();

    // Trim the bot's username from the command and convert to lowercase.
    let username = format!("@{}", me.username());
    let command = command.trim_end_matches(username.as_str()).to_lowercase();
    let params = text[command_full_len..].trim();

    match command.as_str() {
        "/start" | "/menu" => {
            let status = match backend.user_status(user.id).await {
                Ok(x) => x,
                Err(e) => {
                    reply(bot, message, error_reply(&e)).await?;
                    return Ok(true);
                }
            };
            send_menu(
                bot,
                message.chat.id,
                menus::main_menu(&status, &backend.settings.panel_url),
            )
            .await?;
        }
        "/help" => send_menu(bot, message.chat.id, menus::help()).await?,
        "/addmovie" => handle_add_movie(bot, message, user.id, params, backend).await?,
        "/panel" => {
            if backend.gate.is_admin(user.id) {
                let panel = backend.settings.panel_url.as_str();
                reply(
                    bot,
                    message,
                    format!("🛠 Admin panel: <a href=\"{panel}\">{panel}</a>"),
                )
                .await?;
            } else {
                reply(bot, message, error_reply(&Error::Unauthorized)).await?;
            }
        }
        // Unknown commands get the help in private, and nothing elsewhere.
        _ => {
            if !message.chat.is_private() {
                return Ok(false);
            }
            send_menu(bot, message.chat.id, menus::help()).await?;
        }
    }
    Ok(true)
}

async fn handle_add_movie(
    bot: &Bot,
    message: &Message,
    user: UserId,
    title: &str,
    backend: &Backend,
) -> Result<(), RequestError> {
    if !backend.gate.is_admin(user) {
        return reply(bot, message, error_reply(&Error::Unauthorized)).await;
    }

    let Some(post) = message.reply_to_message() else {
        return reply(
            bot,
            message,
            "❌ Reply to the movie's post in the channel, or a forward of it, with /addmovie Title",
        )
        .await;
    };

    let Some(message_id) = channel_post_id(post, backend.settings.channel_id) else {
        return reply(bot, message, "❌ That message is not from the movie channel.").await;
    };

    // A title can also come from the post itself.
    let title = match title {
        "" => post.text_full().and_then(|x| x.lines().next()).unwrap_or(""),
        x => x,
    };

    match backend.add_movie(user, title, message_id).await {
        Ok(movie) => {
            reply(
                bot,
                message,
                format!(
                    "✅ Added \"{}\" (#{}).",
                    html_escape::encode_text(&movie.title),
                    movie.movie_id
                ),
            )
            .await
        }
        Err(Error::Validation(_)) => {
            reply(
                bot,
                message,
                "❌ Give the movie a title. Like: /addmovie Avengers Endgame",
            )
            .await
        }
        Err(e) => reply(bot, message, error_reply(&e)).await,
    }
}

async fn handle_payment_photo(
    bot: &Bot,
    message: &Message,
    user: UserId,
    backend: &Backend,
    sessions: &ChatSessions,
) -> Result<(), RequestError> {
    let Some(plan) = sessions.take_plan(user).await else {
        return reply(
            bot,
            message,
            "⚠️ First pick a plan with /start, then send the photo of the payment.",
        )
        .await;
    };

    let Some(photo) = message.find_biggest_photo() else {
        return Ok(());
    };

    let mut proof = Vec::new();
    if let Err(e) = bot.download_file_to_vec(&photo.file, &mut proof).await {
        log::error!("Failed to download a payment proof from {user}: {e}");
        sessions.choose_plan(user, plan).await;
        return reply(bot, message, "❌ Couldn't get the image. Please send it again.").await;
    }

    // The caption, if any, says how they paid.
    let method = message.caption();

    match backend.payments.submit(user, plan, method, &proof).await {
        Ok(request_id) => {
            reply(
                bot,
                message,
                format!(
                    concat!(
                        "📨 Got it! Payment request <b>#{}</b> for <b>{}</b> ",
                        "is waiting for an administrator. You'll be told once it's reviewed."
                    ),
                    request_id, plan
                ),
            )
            .await
        }
        Err(e) => {
            // Let them try again without picking the plan again.
            sessions.choose_plan(user, plan).await;
            reply(bot, message, error_reply(&e)).await
        }
    }
}

async fn handle_search(
    bot: &Bot,
    message: &Message,
    user: UserId,
    text: &str,
    backend: &Backend,
    sessions: &ChatSessions,
) -> Result<(), RequestError> {
    if let Err(e) = backend.gate.require_active(user).await {
        return reply(bot, message, error_reply(&e)).await;
    }

    let query = text.trim();
    if !Catalog::query_is_searchable(query) {
        return reply(bot, message, "🔍 Type at least 3 characters to search.").await;
    }

    let results = match backend.catalog.search(query, CHAT_SEARCH_LIMIT).await {
        Ok(x) => x,
        Err(e) => return reply(bot, message, error_reply(&e)).await,
    };

    if results.is_empty() {
        return send_menu(bot, message.chat.id, menus::no_results(query)).await;
    }

    let menu = menus::results_page(query, &Page::of(&results, 0));
    sessions
        .remember_search(user, query.to_string(), results)
        .await;
    send_menu(bot, message.chat.id, menu).await
}

/// Replace the menu in `message` if there is one, else send a new one.
async fn show_menu(
    bot: &Bot,
    message: Option<&Message>,
    chat: ChatId,
    (text, keyboard): Menu,
) -> Result<(), RequestError> {
    let Some(message) = message else {
        return send_menu(bot, chat, (text, keyboard)).await;
    };

    let edit_result = bot
        .edit_message_text(message.chat.id, message.id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await;

    // Pressed the button for the menu that's already shown.
    if let Err(RequestError::Api(ApiError::MessageNotModified)) = edit_result {
        return Ok(());
    }
    edit_result?;
    Ok(())
}

pub async fn handle_callback_query(
    bot: Bot,
    query: CallbackQuery,
    backend: Arc<Backend>,
    sessions: Arc<ChatSessions>,
) -> Result<(), RequestError> {
    macro_rules! goodbye {
        ($text:expr) => {
            bot.answer_callback_query(query.id.clone()).text($text).await?;
            return Ok(());
        };
        () => {
            bot.answer_callback_query(query.id.clone()).await?;
            return Ok(());
        };
    }

    let Some(data) = query.data.as_deref() else {
        goodbye!("No query data.");
    };
    let data: CallbackData = match data.parse() {
        Ok(x) => x,
        Err(e) => {
            log::warn!("Got weird callback data: {e}");
            goodbye!("This button doesn't work anymore.");
        }
    };

    let user = query.from.id;
    let chat = ChatId::from(user);
    let message = query.regular_message();

    macro_rules! show {
        ($menu:expr) => {
            show_menu(&bot, message, chat, $menu).await?;
            goodbye!();
        };
    }

    match data {
        CallbackData::Plan(plan) => {
            sessions.choose_plan(user, plan).await;
            show!(menus::payment_instructions(
                plan,
                &backend.settings.payment_details
            ));
        }
        CallbackData::Search => match backend.gate.require_active(user).await {
            Ok(_) => {
                show!(menus::search_prompt());
            }
            Err(e) => {
                goodbye!(error_reply(&e));
            }
        },
        CallbackData::Profile | CallbackData::Home => {
            let status = match backend.user_status(user).await {
                Ok(x) => x,
                Err(e) => {
                    goodbye!(error_reply(&e));
                }
            };
            if data == CallbackData::Profile {
                show!(menus::profile(&status));
            }
            show!(menus::main_menu(&status, &backend.settings.panel_url));
        }
        CallbackData::Renew => {
            show!(menus::plans_menu(None));
        }
        CallbackData::Help => {
            show!(menus::help());
        }
        CallbackData::Page(index) => {
            let Some(search) = sessions.get(user).await.last_search else {
                goodbye!("That search is gone, send the title again.");
            };
            show!(menus::results_page(
                &search.query,
                &Page::of(&search.results, index)
            ));
        }
        CallbackData::Movie(movie_id) => match backend.deliver_movie(user, movie_id).await {
            Ok(delivery) => {
                goodbye!(format!("🎬 {}", delivery.movie.title));
            }
            Err(e) => {
                goodbye!(error_reply(&e));
            }
        },
    }
}
