mod common;

use assert_matches::assert_matches;
use common::*;

use media_detail::model::{Comment, MediaItem, UserId};
use media_detail::view::AvatarView;
use media_detail::{AppError, ErrorKind, Event, OperationKind, Platform, MAX_COMMENT_CHARS};

#[test]
fn opening_seeds_view_state_from_route() {
    let (app, model) = opened(Platform::Ios, photo_route());
    let screen = model.screen.as_ref().unwrap();

    assert_eq!(screen.like_count, 2);
    assert!(!screen.liked_by_current_user);
    assert_eq!(screen.uid_lookup.len(), 3);
    assert_eq!(screen.current_user.as_ref().map(|u| u.id.clone()), Some(UserId::new("me")));

    let view = app.view(&model);
    let media = view.media.unwrap();
    assert_eq!(media.like_label, "2 Likes");
    assert_eq!(media.comments[0].author_name, "Ada Lovelace");
    assert!(media.can_delete);
    assert_eq!(
        media.composer_avatar,
        Some(AvatarView::Initials { text: "MO".into() })
    );
}

#[test]
fn draft_is_clamped_to_input_limit() {
    let (app, mut model) = opened(Platform::Ios, photo_route());

    let update = app.update(
        Event::CommentDraftChanged("x".repeat(MAX_COMMENT_CHARS + 50)),
        &mut model,
    );

    assert!(has_render(&update));
    assert_eq!(
        model.screen.as_ref().unwrap().comment_draft.chars().count(),
        MAX_COMMENT_CHARS
    );
}

#[test]
fn blank_comment_is_ignored() {
    let (app, mut model) = opened(Platform::Ios, photo_route());
    app.update(Event::CommentDraftChanged("   \n ".into()), &mut model);

    let update = app.update(Event::SubmitComment, &mut model);

    assert!(update.effects.is_empty());
    assert!(!model.is_in_flight(OperationKind::AddComment));
}

#[test]
fn successful_comment_refetches_and_toggles_busy() {
    let (app, mut model) = opened(Platform::Ios, photo_route());
    app.update(Event::CommentDraftChanged("lovely".into()), &mut model);

    let update = app.update(Event::SubmitComment, &mut model);

    let requests = http_requests(&update);
    assert_eq!(requests.len(), 1);
    let post = &requests[0];
    assert_eq!(post.method, "POST");
    assert_eq!(post.url, format!("{BASE}/events/e1/media/m1/comments"));
    assert_eq!(header(post, "Authorization"), Some("Bearer token-123"));
    assert!(header(post, "Idempotency-Key").is_some_and(|k| !k.is_empty()));
    let body: serde_json::Value = serde_json::from_slice(&post.body).unwrap();
    assert_eq!(body, serde_json::json!({"message": "lovely"}));

    // busy shows after the delay
    let fired = fire_timers(&app, update, &mut model);
    assert_eq!(fired, vec![300]);
    assert!(model.screen.as_ref().unwrap().is_busy);

    let generation = generation(&model);
    let update = app.update(Event::CommentAdded { generation, result: Ok(()) }, &mut model);

    assert_eq!(model.screen.as_ref().unwrap().comment_draft, "");
    let requests = http_requests(&update);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].url, format!("{BASE}/events/e1/media/m1"));

    let mut fresh = photo_route().item;
    fresh.likes.truncate(1);
    fresh.comments.push(Comment {
        created_by: UserId::new("me"),
        message: "lovely".into(),
        created_at: None,
    });
    let update = app.update(
        Event::MediaRefetched {
            generation,
            result: Box::new(Ok(fresh)),
        },
        &mut model,
    );

    let screen = model.screen.as_ref().unwrap();
    assert_eq!(screen.like_count, 1);
    assert_eq!(screen.media_item.comments.len(), 2);
    assert!(screen.is_busy, "loader stays until the hide delay elapses");

    let fired = fire_timers(&app, update, &mut model);
    assert_eq!(fired, vec![300]);
    assert!(!model.screen.as_ref().unwrap().is_busy);
    assert!(!model.is_in_flight(OperationKind::AddComment));
}

#[test]
fn failed_comment_still_clears_draft_and_refetches() {
    let (app, mut model) = opened(Platform::Ios, photo_route());
    app.update(Event::CommentDraftChanged("will fail".into()), &mut model);
    app.update(Event::SubmitComment, &mut model);

    let generation = generation(&model);
    let update = app.update(
        Event::CommentAdded {
            generation,
            result: Err(AppError::from_http_status(500, None)),
        },
        &mut model,
    );

    let screen = model.screen.as_ref().unwrap();
    assert_eq!(screen.comment_draft, "");
    assert_matches!(&screen.last_error, Some(e) if e.kind == ErrorKind::Internal);
    assert!(http_requests(&update).iter().any(|r| r.method == "GET"));
    assert!(app.view(&model).toast.is_none(), "network failures are not shown");
}

#[test]
fn failed_refetch_keeps_old_state_and_clears_busy() {
    let (app, mut model) = opened(Platform::Ios, photo_route());
    let generation = generation(&model);
    model.screen.as_mut().unwrap().is_busy = true;

    let update = app.update(
        Event::MediaRefetched {
            generation,
            result: Box::new(Err(AppError::new(ErrorKind::Network, "offline"))),
        },
        &mut model,
    );
    assert_eq!(model.screen.as_ref().unwrap().like_count, 2);

    fire_timers(&app, update, &mut model);
    assert!(!model.screen.as_ref().unwrap().is_busy);
}

#[test]
fn second_submit_while_posting_is_ignored() {
    let (app, mut model) = opened(Platform::Ios, photo_route());
    app.update(Event::CommentDraftChanged("once".into()), &mut model);

    let first = app.update(Event::SubmitComment, &mut model);
    assert_eq!(http_requests(&first).len(), 1);

    let second = app.update(Event::SubmitComment, &mut model);
    assert!(http_requests(&second).is_empty());
    assert!(model.is_in_flight(OperationKind::AddComment));
}

#[test]
fn refetch_does_not_touch_favourite_flag() {
    let (app, mut model) = opened(Platform::Ios, photo_route());
    app.update(Event::ToggleFavorite { intended: true }, &mut model);
    let generation = generation(&model);

    let fresh = MediaItem {
        liked_by_user: false,
        ..photo_route().item
    };
    app.update(
        Event::MediaRefetched {
            generation,
            result: Box::new(Ok(fresh)),
        },
        &mut model,
    );

    let screen = model.screen.as_ref().unwrap();
    assert!(screen.liked_by_current_user);
    assert_eq!(screen.like_count, 2);
}

#[test]
fn unconfigured_api_fails_without_panicking() {
    let app = Tester::default();
    let mut model = media_detail::Model::default();
    app.update(Event::ScreenOpened(Box::new(photo_route())), &mut model);
    app.update(Event::CommentDraftChanged("hello".into()), &mut model);

    let update = app.update(Event::SubmitComment, &mut model);

    assert!(http_requests(&update).is_empty());
    let screen = model.screen.as_ref().unwrap();
    assert_eq!(screen.comment_draft, "");
    assert_matches!(&screen.last_error, Some(e) if e.kind == ErrorKind::Configuration);
    assert!(!model.is_in_flight(OperationKind::AddComment));
}
