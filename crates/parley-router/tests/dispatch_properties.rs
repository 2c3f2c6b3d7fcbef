//! Randomised checks of the dispatch order guarantees.

use parley_core::fixtures::{activity, NoopClient};
use parley_core::{Activity, ActivityType, CancellationToken, TurnContext};
use parley_router::{Route, RouteHandler, Router};
use proptest::collection::vec;
use proptest::prelude::*;
use std::sync::{Arc, Mutex};

const TYPES: [ActivityType; 3] = [
    ActivityType::Message,
    ActivityType::Typing,
    ActivityType::ConversationUpdate,
];

#[derive(Debug, Clone)]
struct RouteShape {
    activity_type: Option<usize>,
    text: Option<char>,
}

fn route_shape() -> impl Strategy<Value = RouteShape> {
    (
        proptest::option::of(0..TYPES.len()),
        proptest::option::of(prop::sample::select(vec!['a', 'b', 'c'])),
    )
        .prop_map(|(activity_type, text)| RouteShape {
            activity_type,
            text,
        })
}

fn text_matches(shape: &RouteShape, activity: &Activity) -> bool {
    shape.text.map_or(true, |want| {
        activity.text.as_deref() == Some(want.to_string().as_str())
    })
}

fn build(shapes: &[RouteShape], calls: &Arc<Mutex<Vec<usize>>>) -> Router {
    let mut builder = Router::builder();
    for (index, shape) in shapes.iter().enumerate() {
        let calls = Arc::clone(calls);
        let selector_shape = shape.clone();
        builder.register(Route::new(
            shape.activity_type.map(|i| TYPES[i].clone()),
            None,
            move |activity| text_matches(&selector_shape, activity),
            RouteHandler::fire(move |_ctx, _cancel| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.lock().unwrap().push(index);
                    Ok(())
                }
            }),
        ));
    }
    builder.build()
}

proptest! {
    #[test]
    fn first_registered_match_runs_alone(
        shapes in vec(route_shape(), 0..8),
        type_index in 0..TYPES.len(),
        text in prop::sample::select(vec!['a', 'b', 'c', 'z']),
    ) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let router = build(&shapes, &calls);

        let inbound = activity(TYPES[type_index].clone()).with_text(text.to_string());
        let expected = shapes.iter().position(|shape| {
            shape.activity_type.map_or(true, |i| i == type_index) && text_matches(shape, &inbound)
        });

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime
            .block_on(router.dispatch(
                TurnContext::new(NoopClient::handle(), inbound),
                CancellationToken::new(),
            ))
            .unwrap();

        let calls = calls.lock().unwrap().clone();
        prop_assert!(calls.len() <= 1);
        prop_assert_eq!(calls.first().copied(), expected);
    }
}
