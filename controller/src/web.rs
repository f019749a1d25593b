use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Router,
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use timetemp_common::{ActuatorState, ScheduleSet, ScheduleWindow, UpdateOutcome};

use crate::host::{warn_inverted, AppState};

const PAGE_HEAD: &str = "<!DOCTYPE html> <html>
<head><meta http-equiv='refresh' content='30'/>
<title>Time-Temp-Control</title>
<style>html { font-family: Helvetica; display: inline-block; margin: 0px auto; text-align: center;}
body{margin-top: 50px;} h1 {color: #444444;margin: 50px auto 30px;}
p {font-size: 14px;color: #444444;margin-bottom: 10px;}
input {text-align: right;}
.warn {color: #b00020;}
</style>
</head>
<body>
<div id=\"webpage\">
<h2>Time-Temp-Control</h2>
";

const PAGE_TAIL: &str = "</table><br>
<input type='submit' value='Submit'>
</form>
</div>
</body>
</html>
";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_root_query).post(handle_root_form))
        .fallback(handle_not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_root_query(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    respond(&state, params).await
}

async fn handle_root_form(
    State(state): State<AppState>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    respond(&state, params).await
}

async fn handle_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}

/// Applies a complete field set if one was submitted, then renders the current state.
async fn respond(state: &AppState, params: HashMap<String, String>) -> Response {
    let time_label = state.clock.now().label();

    // The update commits to the storage file, so it runs on the blocking pool while
    // still holding the thermostat lock.
    let mut thermostat = state.thermostat.clone().lock_owned().await;
    let update = tokio::task::spawn_blocking(move || {
        let outcome = thermostat.apply_update(&params);
        (thermostat, outcome)
    })
    .await;

    let thermostat = match update {
        Ok((thermostat, Ok(outcome))) => {
            if let UpdateOutcome::Applied(schedule) = outcome {
                info!(?schedule, "schedule updated");
                warn_inverted(&schedule);
            }
            thermostat
        }
        Ok((_, Err(err))) => {
            warn!("failed to persist schedule update: {err}");
            return persist_failed();
        }
        Err(err) => {
            warn!("schedule update task failed: {err}");
            return persist_failed();
        }
    };

    let page = PageView {
        reading_c: thermostat.last_reading_c(),
        time_label,
        heater: state.relay(),
        schedule: *thermostat.schedule(),
    };
    drop(thermostat);

    Html(render_page(&page)).into_response()
}

fn persist_failed() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Failed to persist schedule").into_response()
}

struct PageView {
    reading_c: Option<f32>,
    time_label: String,
    heater: ActuatorState,
    schedule: ScheduleSet,
}

fn render_page(page: &PageView) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str(PAGE_HEAD);
    let reading = match page.reading_c {
        Some(celsius) => format!("{celsius:.1}&deg;C"),
        None => "--".to_string(),
    };
    html.push_str(&format!(
        "<p>Temperature: {reading} -- Time: {} -- Heater: {}</p>\n",
        page.time_label, page.heater
    ));
    html.push_str("<form action='/' method='get' align='center'><table align='center'>\n");
    html.push_str(
        "<tr><th></th><th>Hour</th><th>Minute</th><th>On below &deg;C</th><th>Off above &deg;C</th><th></th></tr>\n",
    );
    render_row(&mut html, "Day", "day", &page.schedule.day);
    render_row(&mut html, "Night", "night", &page.schedule.night);
    html.push_str(PAGE_TAIL);
    html
}

fn render_row(html: &mut String, title: &str, prefix: &str, window: &ScheduleWindow) {
    html.push_str(&format!("<tr><th>{title}</th>\n"));
    for (suffix, value, unit) in [
        ("hour", window.start_hour, ""),
        ("minute", window.start_minute, ""),
        ("on", window.on_threshold, " &deg;C"),
        ("off", window.off_threshold, " &deg;C"),
    ] {
        html.push_str(&format!(
            " <td><input type='number' id='{prefix}_{suffix}' name='{prefix}_{suffix}' size='2' value='{value}'>{unit}</td>\n"
        ));
    }
    if window.is_inverted() {
        html.push_str(" <td class='warn'>on above off, no dead-band</td>\n");
    } else {
        html.push_str(" <td></td>\n");
    }
    html.push_str("</tr>\n");
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use tower::ServiceExt;

    use timetemp_common::{ConfigStore, FIELD_NAMES};

    use super::*;
    use crate::{
        eeprom::FileStorage,
        host::{
            control_step,
            tests::{morning, test_state, RecordingHeater},
        },
    };

    const UPDATE_QUERY: &str = "/?day_hour=8&day_minute=0&day_on=15&day_off=18\
                                &night_hour=20&night_minute=0&night_on=10&night_off=12";

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, String) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn persisted(dir: &std::path::Path) -> ScheduleSet {
        let storage = FileStorage::open(dir.join("eeprom.bin"), 64).unwrap();
        let mut store = ConfigStore::new(storage).unwrap();
        store.load(&ScheduleSet::default()).schedule
    }

    #[tokio::test]
    async fn plain_get_renders_current_state() {
        let (state, dir) = test_state("web-render", 21.5);
        state.thermostat.lock().await.cycle(&morning(), 21.5);

        let (status, body) = send(&state, get("/")).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Temperature: 21.5&deg;C"));
        assert!(body.contains("Heater: off"));
        for name in FIELD_NAMES {
            assert!(body.contains(&format!("name='{name}'")), "missing {name}");
        }
        assert!(body.contains("name='night_hour' size='2' value='18'"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn full_query_updates_and_persists() {
        let (state, dir) = test_state("web-update", 21.5);

        let (status, body) = send(&state, get(UPDATE_QUERY)).await;

        let expected = ScheduleSet {
            day: ScheduleWindow::new(8, 0, 15, 18),
            night: ScheduleWindow::new(20, 0, 10, 12),
        };
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("name='night_hour' size='2' value='20'"));
        assert_eq!(*state.thermostat.lock().await.schedule(), expected);
        assert_eq!(persisted(&dir), expected);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn partial_query_is_read_only() {
        let (state, dir) = test_state("web-partial", 21.5);
        let before = persisted(&dir);

        let (status, body) = send(&state, get("/?day_hour=5")).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("name='day_hour' size='2' value='8'"));
        assert_eq!(persisted(&dir), before);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn posted_form_is_accepted() {
        let (state, dir) = test_state("web-form", 21.5);
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(
                "day_hour=7&day_minute=30&day_on=16&day_off=abc\
                 &night_hour=22&night_minute=15&night_on=9&night_off=11",
            ))
            .unwrap();

        let (status, body) = send(&state, request).await;

        let expected = ScheduleSet {
            day: ScheduleWindow::new(7, 30, 16, 0),
            night: ScheduleWindow::new(22, 15, 9, 11),
        };
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("on above off, no dead-band"));
        assert_eq!(persisted(&dir), expected);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let (state, dir) = test_state("web-404", 21.5);

        let (status, body) = send(&state, get("/api/status")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "Not found");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn page_reports_heater_on() {
        let html = render_page(&PageView {
            reading_c: Some(-127.0),
            time_label: "Sunday, 06:05".to_string(),
            heater: ActuatorState::On,
            schedule: ScheduleSet::default(),
        });

        assert!(html.contains("Temperature: -127.0&deg;C -- Time: Sunday, 06:05 -- Heater: on"));
        assert!(!html.contains("class='warn'>on above"));
    }

    #[test]
    fn page_before_first_cycle_has_no_reading() {
        let html = render_page(&PageView {
            reading_c: None,
            time_label: "Sunday, 06:05".to_string(),
            heater: ActuatorState::Off,
            schedule: ScheduleSet::default(),
        });

        assert!(html.contains("Temperature: -- -- Time: Sunday, 06:05"));
    }

    #[tokio::test]
    async fn page_shows_relay_state_not_engine_state() {
        let (state, dir) = test_state("web-relay", 14.0);
        let heater = RecordingHeater::failing();
        let output = heater.shared();

        let report = control_step(&state, &output, morning()).await;
        assert_eq!(report.heater, ActuatorState::On);

        let (_, body) = send(&state, get("/")).await;
        assert!(body.contains("Temperature: 14.0&deg;C"));
        assert!(body.contains("Heater: off"));

        heater.set_failing(false);
        control_step(&state, &output, morning()).await;

        let (_, body) = send(&state, get("/")).await;
        assert!(body.contains("Heater: on"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
