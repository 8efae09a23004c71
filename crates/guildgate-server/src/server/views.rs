//! HTML pages: success view and operator forms.

use crate::verify::VerifiedMember;

/// Landing text for `GET /`.
pub const STATUS_TEXT: &str = "guildgate verification service is running\n";

/// Seconds before the success page forwards to the community.
const REDIRECT_SECONDS: u32 = 3;

const STYLE: &str = r"
  * { margin: 0; padding: 0; box-sizing: border-box; }
  body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
         color: #dcddde; background: #36393f; line-height: 1.6; }
  .container { max-width: 560px; margin: 3rem auto; padding: 2rem; background: #2f3136;
               border-radius: 8px; }
  h1 { font-size: 1.6rem; margin-bottom: 1rem; color: #fff; }
  p { margin-bottom: 1rem; }
  label { display: block; margin: 0.75rem 0 0.25rem; color: #b9bbbe; font-size: 0.85em;
          text-transform: uppercase; }
  input, textarea, select { width: 100%; padding: 0.5rem; border-radius: 4px; border: 1px solid #202225;
                            background: #40444b; color: #dcddde; }
  .button { display: inline-block; margin-top: 1rem; padding: 0.6rem 1.2rem; border: 0;
            border-radius: 4px; background: #5865f2; color: #fff; text-decoration: none; cursor: pointer; }
";

/// Escape text for HTML element content and quoted attributes.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn page(title: &str, head_extra: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
{head_extra}
<style>{STYLE}</style>
</head>
<body>
<div class="container">
{body}
</div>
</body>
</html>"#
    )
}

/// Community URL the member is forwarded to after verifying.
pub fn community_url(community_id: &str) -> String {
    format!("https://discord.com/channels/{community_id}")
}

/// Thank-you page forwarding to the community after a short delay.
pub fn success_page(member: &VerifiedMember) -> String {
    let target = escape_html(&community_url(&member.community_id));
    let name = escape_html(&member.display_name);
    page(
        "Verified",
        &format!(r#"<meta http-equiv="refresh" content="{REDIRECT_SECONDS};url={target}">"#),
        &format!(
            r#"<h1>You're verified, {name}!</h1>
<p>Taking you back to the server in {REDIRECT_SECONDS} seconds.</p>
<a class="button" href="{target}">Go now</a>"#
        ),
    )
}

/// Announcement form for `/painel`.
pub fn panel_form() -> String {
    page(
        "Announcement panel",
        "",
        r#"<h1>Post verification announcement</h1>
<form method="post" action="/painel">
  <label for="guild_id">Server ID</label>
  <input id="guild_id" name="guild_id" required>
  <label for="channel_id">Channel ID</label>
  <input id="channel_id" name="channel_id" required>
  <label for="title">Title</label>
  <input id="title" name="title" required>
  <label for="desc">Description</label>
  <textarea id="desc" name="desc" rows="4" required></textarea>
  <label for="image_url">Image URL (optional)</label>
  <input id="image_url" name="image_url">
  <button class="button" type="submit">Post</button>
</form>"#,
    )
}

/// Replay form for `/migrate`, showing how many identities are stored.
pub fn migrate_form(stored: i64) -> String {
    page(
        "Migrate members",
        "",
        &format!(
            r#"<h1>Migrate members</h1>
<p>{stored} verified identities stored.</p>
<form method="post" action="/migrate">
  <label for="action_type">Mode</label>
  <select id="action_type" name="action_type">
    <option value="single">Single identity</option>
    <option value="mass">Random batch</option>
  </select>
  <label for="target_guild_id">Target server ID</label>
  <input id="target_guild_id" name="target_guild_id" required>
  <label for="identifier">User ID or name (single)</label>
  <input id="identifier" name="identifier">
  <label for="amount">How many (batch)</label>
  <input id="amount" name="amount" type="number" min="1">
  <button class="button" type="submit">Run</button>
</form>"#
        ),
    )
}
