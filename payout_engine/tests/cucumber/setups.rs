use cucumber::given;
use payout_engine::db_types::{ActorId, NewActor};

use crate::cucumber::{payout_world::PayoutSystem, PayoutWorld};

#[given(expr = "a fresh install with founding admin {word} \\({int}\\)")]
async fn fresh_database(world: &mut PayoutWorld, name: String, id: i64) {
    let founder = ActorId(id);
    let system = PayoutSystem::new(founder).await;
    system.api.register_actor(NewActor::new(founder, name.as_str())).await.expect("Error registering founder");
    world.system = Some(system);
    world.actors.insert(name, founder);
}

#[given(expr = "a registered worker {word} \\({int}\\)")]
async fn registered_worker(world: &mut PayoutWorld, name: String, id: i64) {
    let actor = ActorId(id);
    world.api().register_actor(NewActor::new(actor, name.as_str())).await.expect("Error registering worker");
    world.actors.insert(name, actor);
}

#[given(expr = "{word} is an admin")]
async fn make_admin(world: &mut PayoutWorld, name: String) {
    let founder = world.api().config().founder_admin_id.expect("No founder configured");
    let actor = world.actor(&name);
    world.api().add_admin(founder, actor).await.expect("Error adding admin");
}
