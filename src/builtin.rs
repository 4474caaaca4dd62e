pub const BUILTIN_CSS: &str = include_str!("builtin.css");

pub const LOGO_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="239" height="27" viewBox="0 0 239 27"><text x="0" y="22" font-family="Inter, sans-serif" font-size="24" font-weight="700" fill="#F8F8F8">spacetraveling<tspan fill="#FF57B2">.</tspan></text></svg>"##;

pub const FAVICON_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="32" height="32" viewBox="0 0 32 32"><circle cx="16" cy="16" r="14" fill="#1A1D23"/><circle cx="16" cy="16" r="5" fill="#FF57B2"/></svg>"##;

pub const ICON_CALENDAR: &str = r#"<svg class="icon" width="20" height="20" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" aria-hidden="true"><rect x="3" y="4" width="18" height="18" rx="2" ry="2"></rect><line x1="16" y1="2" x2="16" y2="6"></line><line x1="8" y1="2" x2="8" y2="6"></line><line x1="3" y1="10" x2="21" y2="10"></line></svg>"#;

pub const ICON_USER: &str = r#"<svg class="icon" width="20" height="20" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" aria-hidden="true"><path d="M20 21v-2a4 4 0 0 0-4-4H8a4 4 0 0 0-4 4v2"></path><circle cx="12" cy="7" r="4"></circle></svg>"#;

pub const ICON_CLOCK: &str = r#"<svg class="icon" width="20" height="20" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" aria-hidden="true"><circle cx="12" cy="12" r="10"></circle><polyline points="12 6 12 12 16 14"></polyline></svg>"#;

pub const LOAD_MORE_JS: &str = r#"(function () {
  var button = document.getElementById("load-more");
  var list = document.getElementById("posts");
  var status = document.getElementById("load-more-status");
  if (!button || !list) return;

  function known(uid) {
    var items = list.children;
    for (var i = 0; i < items.length; i++) {
      if (items[i].getAttribute("data-uid") === uid) return true;
    }
    return false;
  }

  button.addEventListener("click", function () {
    var cursor = button.getAttribute("data-next-page");
    if (!cursor || button.disabled) return;
    button.disabled = true;
    if (status) status.textContent = "";

    fetch("/api/posts?cursor=" + encodeURIComponent(cursor))
      .then(function (res) {
        return res.json().then(function (body) {
          if (!res.ok) throw new Error(body.error || "HTTP " + res.status);
          return body;
        });
      })
      .then(function (body) {
        var holder = document.createElement("ul");
        holder.innerHTML = body.items_html;
        Array.prototype.slice.call(holder.children).forEach(function (item) {
          var uid = item.getAttribute("data-uid");
          if (uid && !known(uid)) list.appendChild(item);
        });
        if (body.next_page) {
          button.setAttribute("data-next-page", body.next_page);
          button.textContent = "Carregar mais posts";
          button.disabled = false;
        } else {
          button.parentNode.removeChild(button);
        }
      })
      .catch(function () {
        button.textContent = "Tentar novamente";
        button.disabled = false;
        if (status) status.textContent = "Não foi possível carregar mais posts.";
      });
  });
})();"#;

pub const FALLBACK_JS: &str = r#"(function () {
  var root = document.getElementById("post-root");
  if (!root) return;
  var parts = location.pathname.replace(/\/+$/, "").split("/");
  var uid = decodeURIComponent(parts[parts.length - 1] || "");

  function failed() {
    root.innerHTML =
      '<div class="loading">Não foi possível carregar o post. ' +
      '<button type="button" class="button" id="retry">Tentar novamente</button></div>';
    document.getElementById("retry").addEventListener("click", resolve);
  }

  function resolve() {
    root.innerHTML = '<div class="loading">Carregando...</div>';
    fetch("/api/post/" + encodeURIComponent(uid))
      .then(function (res) {
        return res.json();
      })
      .then(function (body) {
        if (body.status !== "ready" && body.status !== "not-found") {
          throw new Error(body.error || "unavailable");
        }
        document.title = body.title;
        root.innerHTML = body.html;
      })
      .catch(failed);
  }

  resolve();
})();"#;
