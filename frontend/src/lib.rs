use seed::{prelude::*, virtual_dom::AtValue, *};
use serde_wasm_bindgen::{from_value, to_value};
use shared::{
    presentation::{MapSession, MapSurface, TILE_ATTRIBUTION, TILE_URL_TEMPLATE},
    ApiError, Coordinate, DeviceLocation, DirectionsRequest, DirectionsResponse, LongestOutcome,
    RouteBounds, RouteMode,
};
use wasm_bindgen::prelude::{wasm_bindgen, JsValue};
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen(module = "/map.js")]
extern "C" {
    #[wasm_bindgen(js_name = initMap)]
    fn init_map(container: &str, tile_url: &str, attribution: &str);
    #[wasm_bindgen(js_name = addRouteLayer)]
    fn add_route_layer_js(coords: JsValue) -> u32;
    #[wasm_bindgen(js_name = addMarker)]
    fn add_marker_js(lat: f64, lon: f64) -> u32;
    #[wasm_bindgen(js_name = removeLayer)]
    fn remove_layer_js(id: u32);
    #[wasm_bindgen(js_name = fitBounds)]
    fn fit_bounds_js(south: f64, west: f64, north: f64, east: f64);
    #[wasm_bindgen(js_name = currentPosition)]
    fn current_position_js() -> js_sys::Promise;
}

const MAP_CONTAINER: &str = "map";

fn api_root() -> String {
    if let Some(url) = option_env!("FRONTEND_API_ROOT") {
        return url.trim_end_matches('/').to_string();
    }
    "http://localhost:8080/api/directions".to_string()
}

/// Leaflet map living in `map.js`; layers are referenced by numeric id.
pub struct LeafletSurface;

impl MapSurface for LeafletSurface {
    type Layer = u32;

    fn add_route_layer(&mut self, geometry: &[Coordinate]) -> u32 {
        let coords = to_value(geometry).unwrap_or(JsValue::NULL);
        add_route_layer_js(coords)
    }

    fn add_marker(&mut self, at: Coordinate) -> u32 {
        add_marker_js(at.lat, at.lon)
    }

    fn remove_layer(&mut self, layer: u32) {
        remove_layer_js(layer);
    }

    fn fit_bounds(&mut self, bounds: RouteBounds) {
        fit_bounds_js(bounds.min_lat, bounds.min_lon, bounds.max_lat, bounds.max_lon);
    }
}

pub struct Model {
    form: DirectionsForm,
    pending: bool,
    session: MapSession<LeafletSurface>,
    last_response: Option<DirectionsResponse>,
    error: Option<String>,
    notice: Option<String>,
}

#[derive(Default, Clone)]
struct DirectionsForm {
    start: String,
    end: String,
}

impl DirectionsForm {
    /// Whether the start has to come from the device position.
    fn needs_device_location(&self) -> bool {
        self.start.trim().is_empty()
    }

    fn to_request(
        &self,
        mode: RouteMode,
        device_location: Option<DeviceLocation>,
    ) -> Result<DirectionsRequest, String> {
        let end = self.end.trim();
        if end.is_empty() {
            return Err("Please enter a destination.".to_string());
        }
        let start = self.start.trim();
        Ok(DirectionsRequest {
            start: (!start.is_empty()).then(|| start.to_string()),
            end: end.to_string(),
            device_location,
            mode,
        })
    }
}

pub enum Msg {
    StartChanged(String),
    EndChanged(String),
    Submit(RouteMode),
    DirectionsFetched(Result<DirectionsResponse, String>),
}

pub fn init(_: Url, _: &mut impl Orders<Msg>) -> Model {
    Model {
        form: DirectionsForm::default(),
        pending: false,
        session: MapSession::new(LeafletSurface),
        last_response: None,
        error: None,
        notice: None,
    }
}

pub fn update(msg: Msg, model: &mut Model, orders: &mut impl Orders<Msg>) {
    match msg {
        Msg::StartChanged(val) => model.form.start = val,
        Msg::EndChanged(val) => model.form.end = val,
        Msg::Submit(mode) => {
            if model.pending {
                return;
            }
            // Validate before asking for the device position.
            if let Err(err) = model.form.to_request(mode, None) {
                model.error = Some(err);
                return;
            }
            model.pending = true;
            model.error = None;
            model.notice = None;
            orders.perform_cmd(request_directions(model.form.clone(), mode));
        }
        Msg::DirectionsFetched(result) => {
            model.pending = false;
            match result {
                Ok(response) => {
                    show_directions(&mut model.session, &response);
                    model.notice = response.longest.as_ref().and_then(outcome_notice);
                    model.last_response = Some(response);
                    model.error = None;
                }
                Err(err) => model.error = Some(err),
            }
        }
    }
}

/// Fastest route first; a found longer route then replaces it on the map.
fn show_directions<S: MapSurface>(session: &mut MapSession<S>, response: &DirectionsResponse) {
    session.show_route(&response.fastest.route, response.start, response.end);
    if let Some(LongestOutcome::Found { route, .. }) = &response.longest {
        session.show_route(&route.route, response.start, response.end);
    }
}

fn outcome_notice(outcome: &LongestOutcome) -> Option<String> {
    match outcome {
        LongestOutcome::Found { attempts, .. } => {
            Some(format!("Longer route found after {attempts} attempt(s)."))
        }
        LongestOutcome::Exhausted { attempts } => Some(format!(
            "Could not find a longer route after {attempts} attempts; showing the fastest route."
        )),
    }
}

async fn device_location() -> DeviceLocation {
    match JsFuture::from(current_position_js()).await {
        Ok(value) => from_value(value).unwrap_or_else(|err| DeviceLocation::Unavailable {
            reason: err.to_string(),
        }),
        Err(err) => DeviceLocation::Unavailable {
            reason: err.as_string().unwrap_or_else(|| "unknown error".to_string()),
        },
    }
}

async fn request_directions(form: DirectionsForm, mode: RouteMode) -> Msg {
    let location = if form.needs_device_location() {
        Some(device_location().await)
    } else {
        None
    };
    let payload = match form.to_request(mode, location) {
        Ok(payload) => payload,
        Err(err) => return Msg::DirectionsFetched(Err(err)),
    };
    web_sys::console::debug_1(
        &format!(
            "[frontend] directions request {:?} -> {:?} ({:?})",
            payload.start, payload.end, payload.mode
        )
        .into(),
    );

    let response = match Request::new(api_root()).method(Method::Post).json(&payload) {
        Err(err) => Err(format!("{err:?}")),
        Ok(request) => match request.fetch().await {
            Err(err) => Err(format!("{err:?}")),
            Ok(raw) if raw.status().is_ok() => raw
                .json::<DirectionsResponse>()
                .await
                .map_err(|err| format!("{err:?}")),
            Ok(raw) => {
                let status = raw.status();
                match raw.json::<ApiError>().await {
                    Ok(api_error) => Err(api_error.message),
                    Err(_) => Err(format!("Request failed ({} {})", status.code, status.text)),
                }
            }
        },
    };

    Msg::DirectionsFetched(response)
}

pub fn view(model: &Model) -> Node<Msg> {
    let header = h1!["Detour"];
    let form = view_form(model);
    let directions = view_directions(model);

    div![C!["app-container"], header, form, directions]
}

fn view_form(model: &Model) -> Node<Msg> {
    let input_field = |label: &str, value: &str, placeholder: &str, msg: fn(String) -> Msg| {
        div![
            C!["input-field"],
            label![label],
            input![
                attrs! {
                    At::Value => value,
                    At::Placeholder => placeholder,
                    At::AutoComplete => "off",
                },
                input_ev(Ev::Input, msg),
            ]
        ]
    };

    let mode_button = |label: &str, mode: RouteMode| {
        button![
            label,
            ev(Ev::Click, move |event| {
                event.prevent_default();
                Msg::Submit(mode)
            }),
            attrs! { At::Disabled => bool_attr(model.pending) },
        ]
    };

    form![
        C!["controls"],
        input_field(
            "Start",
            &model.form.start,
            "Current location",
            Msg::StartChanged
        ),
        input_field("End", &model.form.end, "Destination", Msg::EndChanged),
        div![
            C!["mode-buttons"],
            mode_button("Fastest route", RouteMode::Fastest),
            mode_button("Longest route", RouteMode::Longest),
        ],
        if model.pending {
            p![C!["pending"], "Searching for a route..."]
        } else {
            empty![]
        },
        if let Some(notice) = &model.notice {
            p![C!["notice"], notice]
        } else {
            empty![]
        },
        if let Some(error) = &model.error {
            p![C!["error"], error]
        } else {
            empty![]
        }
    ]
}

fn view_directions(model: &Model) -> Node<Msg> {
    let Some(distance_m) = model.session.distance_m() else {
        return div![
            C!["directions"],
            p!["Enter a destination to get turn-by-turn directions."]
        ];
    };

    let items = model.session.directions().iter().map(|item| {
        li![
            C!["direction"],
            item.icon.as_ref().map(|icon| {
                img![attrs! {
                    At::Src => icon,
                    At::Alt => item.modifier.map(|m| m.as_str()).unwrap_or_default(),
                }]
            }),
            span![item.to_string()],
        ]
    });

    div![
        C!["directions"],
        h2![format!(
            "{:.1} miles",
            shared::presentation::meters_to_miles(distance_m)
        )],
        ol![items],
    ]
}

#[wasm_bindgen(start)]
pub fn start() {
    init_map(MAP_CONTAINER, TILE_URL_TEMPLATE, TILE_ATTRIBUTION);
    App::start("app", init, update, view);
}

fn bool_attr(value: bool) -> AtValue {
    if value {
        AtValue::Some("true".into())
    } else {
        AtValue::Ignored
    }
}
