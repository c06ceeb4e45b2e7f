#![allow(dead_code)]

use crux_core::testing::{AppTester, Update};
use crux_http::protocol::HttpRequest;
use secrecy::SecretString;

use media_detail::capabilities::{TimerOperation, TimerOutput};
use media_detail::event::Generation;
use media_detail::model::{
    Comment, EventDetails, EventId, MediaId, MediaItem, MediaKind, MediaRoute, UserId, UserRef,
};
use media_detail::{App, Config, Effect, Event, Model, Platform};

pub type Tester = AppTester<App, Effect>;

pub const BASE: &str = "https://api.example.com/v1";

pub fn user(id: &str, first: &str, last: &str) -> UserRef {
    UserRef {
        id: UserId::new(id),
        first_name: first.into(),
        last_name: last.into(),
        ..UserRef::default()
    }
}

pub fn me() -> UserRef {
    user("me", "Mae", "Owner")
}

pub fn config(platform: Platform) -> Config {
    Config {
        api_base_url: BASE.into(),
        auth_token: Some(SecretString::new("token-123".into())),
        platform,
        ..Config::default()
    }
}

pub fn photo_route() -> MediaRoute {
    MediaRoute {
        item: MediaItem {
            id: MediaId::new("m1"),
            event_id: EventId::new("e1"),
            uploaded_by: UserId::new("me"),
            kind: MediaKind::Photo,
            presigned_get_url: "https://bucket.example.com/e1/m1.jpg?X-Amz-Signature=abc".into(),
            likes: vec![user("u2", "Ada", "Lovelace"), user("u3", "Grace", "Hopper")],
            comments: vec![Comment {
                created_by: UserId::new("u2"),
                message: "first!".into(),
                created_at: None,
            }],
            liked_by_user: false,
        },
        event_details: EventDetails {
            id: EventId::new("e1"),
            host: Some(me()),
            members: vec![user("u2", "Ada", "Lovelace"), user("u3", "Grace", "Hopper")],
        },
    }
}

/// Configured app with the photo screen mounted and the session user loaded.
pub fn opened(platform: Platform, route: MediaRoute) -> (Tester, Model) {
    let app = Tester::default();
    let mut model = Model::default();

    app.update(Event::Configure(Box::new(config(platform))), &mut model);
    app.update(Event::ScreenOpened(Box::new(route)), &mut model);
    let generation = model.generation;
    app.update(
        Event::CurrentUserLoaded {
            generation,
            result: Ok(Some(me())),
        },
        &mut model,
    );

    (app, model)
}

pub fn generation(model: &Model) -> Generation {
    model.generation
}

pub fn http_requests(update: &Update<Effect, Event>) -> Vec<HttpRequest> {
    update
        .effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Http(request) => Some(request.operation.clone()),
            _ => None,
        })
        .collect()
}

pub fn header<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
    request
        .headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

pub fn has_render(update: &Update<Effect, Event>) -> bool {
    update
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::Render(_)))
}

/// Fires every timer in `update` and feeds the resulting events back in.
pub fn fire_timers(app: &Tester, update: Update<Effect, Event>, model: &mut Model) -> Vec<u64> {
    let mut fired = Vec::new();
    for effect in update.effects {
        if let Effect::Timer(mut request) = effect {
            let TimerOperation::Start { millis } = request.operation.clone();
            fired.push(millis);
            let resolved = app
                .resolve(&mut request, TimerOutput::Elapsed)
                .expect("timer resolves");
            for event in resolved.events {
                app.update(event, model);
            }
        }
    }
    fired
}
