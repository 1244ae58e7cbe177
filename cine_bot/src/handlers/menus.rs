//! Texts and keyboards of the chat menus. All texts are HTML.

use html_escape::encode_text;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use url::Url;

use super::callbacks::CallbackData;
use crate::{
    backend::UserStatus,
    catalog::{pagination::Page, MIN_QUERY_LEN},
    database::Movie,
    types::Plan,
};

pub type Menu = (String, InlineKeyboardMarkup);

fn button(text: impl Into<String>, data: CallbackData) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, data.to_string())
}

fn home_row() -> Vec<InlineKeyboardButton> {
    vec![button("🔙 Back to start", CallbackData::Home)]
}

fn expiry_date(status: &UserStatus) -> String {
    status
        .expires_at
        .map(|x| x.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// What `/start` shows: the subscriber menu for active users, the plans for
/// everyone else.
pub fn main_menu(status: &UserStatus, panel_url: &Url) -> Menu {
    if !status.active {
        return plans_menu(status.is_admin.then_some(panel_url));
    }

    let plan = status.plan.map_or("-", Plan::title);
    let text = format!(
        concat!(
            "🎬 <b>Welcome back!</b>\n\n",
            "Plan: <b>{}</b>\n",
            "Days left: <b>{}</b>\n\n",
            "Send me a movie title to search for it."
        ),
        plan, status.days_left
    );

    let mut rows = vec![
        vec![
            button("🔍 Search", CallbackData::Search),
            button("👤 My profile", CallbackData::Profile),
        ],
        vec![button("❓ Help", CallbackData::Help)],
    ];
    if status.is_admin {
        rows.push(vec![InlineKeyboardButton::url("🛠 Panel", panel_url.clone())]);
    }
    (text, InlineKeyboardMarkup::new(rows))
}

/// The plans and their prices. `panel_url` adds a panel button for admins.
pub fn plans_menu(panel_url: Option<&Url>) -> Menu {
    let mut text = String::from("🎬 <b>Welcome to CineBot!</b>\n\nPick a plan:\n\n");
    for plan in Plan::ALL {
        let perk = match plan {
            Plan::Classic => "watch in the bot, no forwarding or saving",
            Plan::Premium => "forward and save the movies too",
        };
        text.push_str(&format!(
            "<b>{}</b>: {} CUP by card or wallet, {} CUP in mobile balance. 30 days, {}.\n",
            plan.title(),
            plan.card_price(),
            plan.balance_price(),
            perk
        ));
    }

    let mut rows = vec![
        Plan::ALL
            .iter()
            .map(|&plan| {
                button(
                    format!("{} ({} CUP)", plan.title(), plan.card_price()),
                    CallbackData::Plan(plan),
                )
            })
            .collect(),
        vec![button("❓ Help", CallbackData::Help)],
    ];
    if let Some(url) = panel_url {
        rows.push(vec![InlineKeyboardButton::url("🛠 Panel", url.clone())]);
    }
    (text, InlineKeyboardMarkup::new(rows))
}

/// How to pay for the chosen plan.
pub fn payment_instructions(plan: Plan, payment_details: &str) -> Menu {
    let text = format!(
        concat!(
            "💳 You chose <b>{}</b>.\n\n",
            "Pay {} CUP by card or wallet, or {} CUP in mobile balance.\n\n",
            "{}\n\n",
            "Then send me a <b>photo of the payment</b> (a screenshot works) ",
            "and an administrator will review it."
        ),
        plan.title(),
        plan.card_price(),
        plan.balance_price(),
        encode_text(payment_details)
    );
    (text, InlineKeyboardMarkup::new(vec![home_row()]))
}

pub fn profile(status: &UserStatus) -> Menu {
    let text = if status.exists {
        format!(
            concat!(
                "👤 <b>Your profile</b>\n\n",
                "Plan: {}\n",
                "Status: {}\n",
                "Expires: {}\n",
                "Days left: {}"
            ),
            status.plan.map_or("-", Plan::title),
            if status.active { "✅ active" } else { "❌ expired" },
            expiry_date(status),
            status.days_left
        )
    } else {
        "👤 You have no subscription yet.".to_string()
    };

    let mut rows = Vec::new();
    if !status.active || status.days_left <= 5 {
        rows.push(vec![button("🔄 Renew", CallbackData::Renew)]);
    }
    rows.push(home_row());
    (text, InlineKeyboardMarkup::new(rows))
}

pub fn help() -> Menu {
    let text = format!(
        concat!(
            "❓ <b>How it works</b>\n\n",
            "1. Pick a plan with /start.\n",
            "2. Pay and send a photo of the payment here.\n",
            "3. Once an administrator approves it, send me a movie title ",
            "(at least {} characters) and pick it from the results.\n\n",
            "Classic movies can't be forwarded or saved, Premium ones can.\n",
            "You'll be reminded before your subscription runs out."
        ),
        MIN_QUERY_LEN
    );
    (text, InlineKeyboardMarkup::new(vec![home_row()]))
}

pub fn search_prompt() -> Menu {
    (
        "🔍 Send me the title of the movie you're looking for.".to_string(),
        InlineKeyboardMarkup::new(vec![home_row()]),
    )
}

pub fn no_results(query: &str) -> Menu {
    (
        format!(
            "😕 Found no movie matching \"{}\". Try another title.",
            encode_text(query)
        ),
        InlineKeyboardMarkup::new(vec![home_row()]),
    )
}

/// One page of search results, a button per movie, and navigation buttons
/// only where there's somewhere to go.
pub fn results_page(query: &str, page: &Page<'_, Movie>) -> Menu {
    let text = format!(
        "🎥 <b>Results for \"{}\"</b> (page {}/{}):",
        encode_text(query),
        page.index + 1,
        page.total_pages().max(1)
    );

    let mut rows: Vec<Vec<InlineKeyboardButton>> = page
        .items
        .iter()
        .map(|movie| vec![button(movie.title.clone(), CallbackData::Movie(movie.movie_id))])
        .collect();

    let mut navigation = Vec::new();
    if page.has_previous() {
        navigation.push(button("⬅️ Previous", CallbackData::Page(page.index - 1)));
    }
    if page.has_next() {
        navigation.push(button("Next ➡️", CallbackData::Page(page.index + 1)));
    }
    if !navigation.is_empty() {
        rows.push(navigation);
    }

    rows.push(home_row());
    (text, InlineKeyboardMarkup::new(rows))
}
