//! A profile store: typed fields, derived values, and a projection.

use serde_json::json;
use treestate::{ActionFailure, Node, TypeTag};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let profile = Node::build("profile")
        .child("name", json!("Bob"))
        .child_typed("x", json!(0), TypeTag::Number)
        .child_typed("y", json!(0), TypeTag::Number)
        .child_typed("dist", json!(0), TypeTag::Number)
        .action("updateDist", |node, _args| {
            let x = node.get("x").and_then(|v| v.as_i64()).unwrap_or(0);
            let y = node.get("y").and_then(|v| v.as_i64()).unwrap_or(0);
            let dist = ((x * x + y * y) as f64).sqrt().round() as i64;
            node.set_field("dist", json!(dist))
                .map_err(|e| ActionFailure::from(e.to_string()))?;
            Ok(None)
        })
        .watch("x", "updateDist")
        .watch("y", "updateDist")
        .finish()?;

    let _values = profile.subscribe(|node| println!("state: {}", node.values()))?;
    let _errors = profile.subscribe_errors(|event| println!("error lane: {event:?}"))?;

    // Derived 'dist' recomputes inside the same broadcast as the change.
    profile.set_field("x", json!(3))?;
    profile.set_field("y", json!(4))?;

    // Validation failures never reach the value lane.
    profile.set_field("x", json!("three"))?;

    // A projection only emits when one of its fields actually changes.
    let position = profile.filter(&["x", "y"])?;
    let _pos = position.subscribe(|v| println!("position: {v}"));
    profile.set_field("name", json!("Robert"))?; // projection stays quiet
    profile.set_field("x", json!(10))?;

    profile.complete()?;
    Ok(())
}
