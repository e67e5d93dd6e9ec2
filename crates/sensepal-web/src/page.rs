/// Server-rendered HTML for the home page.
///
/// The map itself is drawn by the Maps JavaScript SDK in the browser; the page
/// only embeds the `MapView` as JSON and a small script that binds it to SDK
/// markers, the info window, and the search socket.
use std::fmt::Write;

use sensepal_common::card::PlaceCard;
use sensepal_common::map::MapView;

const QUICK_FILTERS: [&str; 3] = ["🔈 Quiet Places", "🚪 Break Room", "☀️ Natural Light"];

const MAP_ERROR_CAUSES: [&str; 4] = [
    "Enabled billing in Google Cloud Console",
    "Enabled Maps JavaScript API",
    "Enabled Places API",
    "Created a valid API key",
];

pub struct HomePage<'a> {
    pub api_key: &'a str,
    pub map: &'a MapView,
    pub cards: &'a [PlaceCard],
}

pub fn render_home(page: &HomePage<'_>) -> String {
    let map_json = script_safe_json(page.map);

    let mut cards = String::new();
    for card in page.cards {
        render_card(&mut cards, card);
    }

    let mut filters = String::new();
    for label in QUICK_FILTERS {
        let _ = write!(filters, r#"<button class="chip">{}</button>"#, escape(label));
    }

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>SensePal</title>
<style>{STYLE}</style>
</head>
<body>
<header>
  <h1>SensePal</h1>
  <div class="search">
    <input id="search" type="text" autocomplete="off" placeholder="Search for sensory-friendly places...">
    <div id="search-loading" class="spinner" hidden></div>
    <div id="predictions" class="predictions" hidden></div>
  </div>
</header>
<main>
  <div class="filters">{filters}</div>
  <div id="map" class="map"></div>
  <section class="places">
    <h2>Nearby Sensory-Friendly Places ({count})</h2>
    {cards}
  </section>
</main>
<script id="map-view" type="application/json">{map_json}</script>
<script>{SCRIPT}</script>
<script async src="https://maps.googleapis.com/maps/api/js?key={key}&libraries=places&callback=initMap"></script>
</body>
</html>"#,
        count = page.cards.len(),
        key = escape(page.api_key),
    )
}

/// Static panel shown when the map cannot load.
pub fn render_map_error() -> String {
    let mut causes = String::new();
    for cause in MAP_ERROR_CAUSES {
        let _ = write!(causes, "<li>{}</li>", escape(cause));
    }
    format!(
        r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>SensePal</title><style>{STYLE}</style></head>
<body>
<div class="map-error">
  <p>Error loading maps. Please make sure you have:</p>
  <ul>{causes}</ul>
</div>
</body>
</html>"#
    )
}

fn render_card(out: &mut String, card: &PlaceCard) {
    let rating_line = card
        .rating
        .map(|r| format!("Rating: {r} ⭐"))
        .unwrap_or_default();
    let _ = write!(
        out,
        r#"<article class="card" data-place-id="{id}" data-vicinity="{vicinity}" data-rating-line="{rating_line}"><div class="card-head"><div><h3>{name}</h3><p class="muted">{label}</p></div>"#,
        id = escape(&card.place_id),
        vicinity = escape(card.vicinity.as_deref().unwrap_or_default()),
        rating_line = escape(&rating_line),
        name = escape(&card.name),
        label = escape(&card.type_label),
    );
    if let Some(rating) = card.rating {
        let _ = write!(out, r#"<span class="rating">{rating} ⭐</span>"#);
    }
    out.push_str("</div>");
    if let Some(vicinity) = &card.vicinity {
        let _ = write!(out, r#"<p class="muted">{}</p>"#, escape(vicinity));
    }
    if let Some(status) = &card.open_status {
        let _ = write!(out, r#"<p class="status">{}</p>"#, escape(status));
    }
    let _ = write!(
        out,
        r#"<div class="actions"><a class="chip" target="_blank" rel="noopener" href="{}">🗺️ Directions</a>"#,
        escape(&card.directions_url)
    );
    if let Some(website) = &card.website {
        let _ = write!(
            out,
            r#"<a class="chip" target="_blank" rel="noopener" href="{}">🌐 Website</a>"#,
            escape(website)
        );
    }
    out.push_str("</div></article>");
}

/// Minimal HTML escaping for text and attribute values.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON that cannot terminate the surrounding `<script>` element.
fn script_safe_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}

const STYLE: &str = r#"
body{margin:0;font-family:system-ui,sans-serif;background:#f9fafb;color:#111827}
header{position:sticky;top:0;background:#fff;box-shadow:0 1px 2px rgba(0,0,0,.08);padding:12px 16px;z-index:10}
h1{font-size:1.25rem;color:#2563eb;margin:0 0 8px}
.search{position:relative}
#search{width:100%;box-sizing:border-box;padding:8px 16px;border:1px solid #d1d5db;border-radius:8px}
.spinner{position:absolute;right:12px;top:8px;width:16px;height:16px;border:2px solid #2563eb;border-top-color:transparent;border-radius:50%;animation:spin 1s linear infinite}
@keyframes spin{to{transform:rotate(360deg)}}
.predictions{position:absolute;width:100%;background:#fff;border:1px solid #e5e7eb;border-radius:8px;max-height:15rem;overflow-y:auto;z-index:50}
.predictions button{display:block;width:100%;text-align:left;padding:8px 16px;border:0;background:#fff}
.filters{display:flex;gap:8px;overflow-x:auto;padding:12px 16px;background:#fff}
.chip{padding:6px 14px;border-radius:999px;background:#dbeafe;color:#1d4ed8;border:0;text-decoration:none;white-space:nowrap}
.map{height:50vh}
.places{padding:16px}
.card{background:#fff;border-radius:8px;padding:16px;margin-bottom:12px;box-shadow:0 1px 2px rgba(0,0,0,.06);cursor:pointer}
.card-head{display:flex;justify-content:space-between;align-items:flex-start}
.card h3{margin:0;font-weight:500}
.muted{color:#4b5563;font-size:.875rem}
.status{color:#16a34a;font-size:.875rem}
.rating{background:#eff6ff;color:#1d4ed8;border-radius:999px;padding:4px 8px;font-size:.875rem}
.actions{display:flex;gap:8px;margin-top:12px}
.map-error{display:flex;flex-direction:column;align-items:center;justify-content:center;height:100vh;color:#dc2626;text-align:center}
"#;

const SCRIPT: &str = r#"
(function(){
  var params = new URLSearchParams(location.search);
  if(!params.has('lat') && !params.has('geo')){
    if(navigator.geolocation){
      navigator.geolocation.getCurrentPosition(
        function(p){ location.replace('?lat=' + p.coords.latitude + '&lng=' + p.coords.longitude); },
        function(){ location.replace('?geo=denied'); });
    } else {
      location.replace('?geo=unsupported');
    }
  }
  var view = JSON.parse(document.getElementById('map-view').textContent);
  var map, info, markers = {};
  function icon(i){return {path: google.maps.SymbolPath.CIRCLE, fillColor: i.fill_color, fillOpacity: i.fill_opacity, strokeColor: i.stroke_color, strokeWeight: i.stroke_weight, scale: i.scale};}
  function openInfo(w){
    if(!w){return;}
    var html = '<div><h3></h3><p></p>' + (w.rating_line ? '<p></p>' : '') + '</div>';
    var el = document.createElement('div'); el.innerHTML = html;
    el.querySelector('h3').textContent = w.name;
    var ps = el.querySelectorAll('p'); ps[0].textContent = w.vicinity || '';
    if(w.rating_line){ps[1].textContent = w.rating_line;}
    info.setContent(el); info.setPosition(w.position); info.open(map);
  }
  window.initMap = function(){
    var o = view.options;
    map = new google.maps.Map(document.getElementById('map'), {center: view.camera.center, zoom: view.camera.zoom,
      disableDefaultUI: o.disable_default_ui, zoomControl: o.zoom_control, mapTypeControl: o.map_type_control,
      scaleControl: o.scale_control, streetViewControl: o.street_view_control, rotateControl: o.rotate_control,
      fullscreenControl: o.fullscreen_control});
    info = new google.maps.InfoWindow();
    view.markers.forEach(function(m){
      var marker = new google.maps.Marker({position: m.position, map: map, title: m.title || undefined, icon: icon(m.icon)});
      if(m.place_id){markers[m.place_id] = m; marker.addListener('click', function(){ select(m.place_id); });}
    });
    openInfo(view.info_window);
  };
  function select(id){
    var m = markers[id], c = document.querySelector('[data-place-id="' + CSS.escape(id) + '"]');
    if(!m || !c){return;}
    openInfo({name: m.title, position: m.position, vicinity: c.dataset.vicinity, rating_line: c.dataset.ratingLine});
  }
  document.querySelectorAll('.card').forEach(function(c){ c.addEventListener('click', function(e){ if(e.target.tagName !== 'A'){ select(c.dataset.placeId); } }); });

  var input = document.getElementById('search'), list = document.getElementById('predictions');
  var spinner = document.getElementById('search-loading'), lastSelection = null;
  var ws = new WebSocket((location.protocol === 'https:' ? 'wss://' : 'ws://') + location.host + '/ws/search');
  input.addEventListener('input', function(){ ws.send(JSON.stringify({type: 'input', text: input.value})); });
  ws.onmessage = function(ev){
    var s = JSON.parse(ev.data);
    spinner.hidden = !s.loading;
    list.innerHTML = '';
    s.predictions.forEach(function(p){
      var b = document.createElement('button');
      var main = document.createElement('div'); main.textContent = p.main_text;
      var sec = document.createElement('div'); sec.className = 'muted'; sec.textContent = p.secondary_text;
      b.appendChild(main); b.appendChild(sec);
      b.addEventListener('click', function(){ ws.send(JSON.stringify({type: 'select', prediction: p})); });
      list.appendChild(b);
    });
    list.hidden = s.predictions.length === 0;
    if(!s.selection){ lastSelection = null; return; }
    var sel = s.selection;
    if(lastSelection === sel.result.id){ return; }
    lastSelection = sel.result.id;
    input.value = s.query;
    if(map){
      map.panTo(sel.camera.center); map.setZoom(sel.camera.zoom);
      openInfo({name: sel.result.name, position: sel.result.location, vicinity: sel.result.formatted_address});
    }
  };
})();
"#;
