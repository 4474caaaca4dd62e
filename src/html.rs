use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::builtin;
use crate::listing::Listing;
use crate::post::{PageStatus, PostDetail, PostSummary};

pub const SITE_NAME: &str = "spacetraveling.";
pub const CSS_HREF: &str = "/assets/css/site.css";
pub const LOGO_HREF: &str = "/logo.svg";
pub const FAVICON_HREF: &str = "/favicon.svg";

pub const LOAD_MORE_LABEL: &str = "Carregar mais posts";
pub const LOADING_LABEL: &str = "Carregando...";
pub const NOT_FOUND_LABEL: &str = "Post não encontrado";

fn page(title: &str, body: Markup, script: Option<&str>) -> String {
    let markup: Markup = html! {
        (DOCTYPE)
        html lang="pt-BR" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                link rel="icon" type="image/svg+xml" href=(FAVICON_HREF);
                link rel="stylesheet" href=(CSS_HREF);
            }
            body {
                (header())
                (body)
                @if let Some(js) = script {
                    script { (PreEscaped(js)) }
                }
            }
        }
    };
    markup.into_string()
}

fn header() -> Markup {
    html! {
        header class="site-header" {
            a href="/" {
                img src=(LOGO_HREF) width="239" height="27" alt="logo";
            }
        }
    }
}

pub fn build_listing_html(listing: &Listing) -> String {
    let body = html! {
        main class="container" {
            section {
                ul id="posts" class="posts" {
                    (render_summaries(listing.posts()))
                }
                @if let Some(cursor) = listing.next_page() {
                    button type="button" id="load-more" class="button" data-next-page=(cursor) {
                        (LOAD_MORE_LABEL)
                    }
                    p id="load-more-status" class="load-more-status" role="status" {}
                }
            }
        }
    };
    let script = listing.has_more().then_some(builtin::LOAD_MORE_JS);
    page(&format!("{SITE_NAME} | Home"), body, script)
}

pub fn render_summaries(posts: &[PostSummary]) -> Markup {
    html! {
        @for p in posts {
            (render_summary(p))
        }
    }
}

fn render_summary(p: &PostSummary) -> Markup {
    html! {
        li data-uid=(p.uid) {
            a href=(post_href(&p.uid)) {
                h3 class="title" { (p.title) }
                p class="subtitle" { (p.subtitle) }
            }
            div class="info" {
                span {
                    (PreEscaped(builtin::ICON_CALENDAR))
                    time { (p.first_publication_date) }
                }
                span {
                    (PreEscaped(builtin::ICON_USER))
                    (p.author)
                }
            }
        }
    }
}

pub fn post_href(uid: &str) -> String {
    format!("/post/{uid}")
}

pub fn status_title(status: &PageStatus) -> String {
    match status {
        PageStatus::Ready(post) if !post.title.is_empty() => format!("{SITE_NAME} | {}", post.title),
        PageStatus::Ready(_) => SITE_NAME.to_string(),
        PageStatus::Loading => format!("{SITE_NAME} | {LOADING_LABEL}"),
        PageStatus::NotFound => format!("{SITE_NAME} | {NOT_FOUND_LABEL}"),
    }
}

pub fn build_detail_html(status: &PageStatus) -> String {
    let body = html! {
        div id="post-root" {
            (render_status(status))
        }
    };
    let script = matches!(status, PageStatus::Loading).then_some(builtin::FALLBACK_JS);
    page(&status_title(status), body, script)
}

pub fn render_status(status: &PageStatus) -> Markup {
    match status {
        PageStatus::Loading => html! {
            div class="loading" { (LOADING_LABEL) }
        },
        PageStatus::NotFound => html! {
            main class="container" {
                div class="loading" {
                    (NOT_FOUND_LABEL) " "
                    a href="/" { "Voltar ao início" }
                }
            }
        },
        PageStatus::Ready(post) => render_post(post),
    }
}

fn render_post(post: &PostDetail) -> Markup {
    let banner_style = format!("background-image: url(\"{}\")", css_url(&post.banner_url));
    html! {
        @if !post.banner_url.is_empty() {
            section class="banner" style=(banner_style) {}
        }
        main {
            header class="container post-header" {
                h1 class="title" { (post.title) }
                div class="info" {
                    span {
                        (PreEscaped(builtin::ICON_CALENDAR))
                        time { (post.first_publication_date) }
                    }
                    span {
                        (PreEscaped(builtin::ICON_USER))
                        (post.author)
                    }
                    span {
                        (PreEscaped(builtin::ICON_CLOCK))
                        (post.reading_time()) " min"
                    }
                }
            }
            article class="container content" {
                @for part in &post.content {
                    section {
                        @if !part.heading.is_empty() {
                            h2 { (part.heading) }
                        }
                        div class="body" {
                            (PreEscaped(part.body.as_html()))
                        }
                    }
                }
            }
        }
    }
}

fn css_url(url: &str) -> String {
    url.chars()
        .filter(|c| !matches!(c, '"' | '\\' | '\n' | '\r' | '(' | ')'))
        .collect()
}
