//! A stoplight machine: action-driven cycling and a gated transition.

use treestate::Machine;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let light = Machine::new("stoplight", ["red", "yellow", "green"], "red")?;
    light.add_action("advance", "red", "green")?;
    light.add_action("advance", "green", "yellow")?;
    light.add_action("advance", "yellow", "red")?;

    let _states = light.subscribe(|state| println!("light is now {state}"));

    for _ in 0..3 {
        light.dispatch("advance", &[])?;
    }

    // A gated transition: the commit waits on an external signal, and the
    // pending target is visible in the meantime.
    let (clear, crossing) = tokio::sync::oneshot::channel::<()>();
    let pending = light.go_when("green", async move { crossing.await })?;
    println!("waiting to enter {:?}", light.next_state());
    let _ = clear.send(());
    pending.await?;

    println!("traveled: {:?}", light.history().path());
    light.complete();
    Ok(())
}
