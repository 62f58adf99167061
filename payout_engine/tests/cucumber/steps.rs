use std::str::FromStr;

use cucumber::{given, then, when};
use payout_common::Amount;
use payout_engine::{
    db_types::{Direction, PayoutRequest, Proof, RequestStatus},
    pipelines::{Completion, FlowError, Outcome, Payload, Prompt},
    sessions::{Role, Step},
    PreconditionFailed,
};

use crate::cucumber::PayoutWorld;

async fn send(world: &mut PayoutWorld, name: &str, role: Role, payload: Payload) {
    let actor = world.actor(name);
    let outcome = world.api().submit_input(actor, role, payload).await;
    world.last_outcome = Some(outcome);
}

async fn fetch_request(world: &PayoutWorld, id: i64) -> PayoutRequest {
    world.api().get_request(id).await.expect("Error fetching request").expect("Request does not exist")
}

fn status(s: &str) -> RequestStatus {
    match s {
        "AwaitingValuation" => RequestStatus::AwaitingValuation,
        "Rejected" => RequestStatus::Rejected,
        "Paid" => RequestStatus::Paid,
        _ => panic!("Unknown status {s}"),
    }
}

fn step(s: &str) -> Step {
    match s {
        "CollectingWallet" => Step::CollectingWallet,
        "SelectingWallet" => Step::SelectingWallet,
        "SelectingDirection" => Step::SelectingDirection,
        "CollectingReferenceLink" => Step::CollectingReferenceLink,
        "CollectingProofs" => Step::CollectingProofs,
        "Pricing" => Step::Pricing,
        "Rejecting" => Step::Rejecting,
        "ConfirmingPayment" => Step::ConfirmingPayment,
        _ => panic!("Unknown step {s}"),
    }
}

//--------------------------------------   Submission flow   ---------------------------------------------------------
#[when(expr = "{word} starts a new request")]
async fn start_request(world: &mut PayoutWorld, name: String) {
    let actor = world.actor(&name);
    let outcome = world.api().start_submission(actor).await;
    world.last_outcome = Some(outcome);
}

#[when(expr = "{word} sends {string}")]
async fn send_text(world: &mut PayoutWorld, name: String, text: String) {
    send(world, &name, Role::Submitter, Payload::text(text)).await;
}

#[when(expr = "{word} chooses the direction {string}")]
async fn choose_direction(world: &mut PayoutWorld, name: String, direction: String) {
    let direction = Direction::from_str(&direction).expect("Not a valid direction");
    send(world, &name, Role::Submitter, Payload::SelectDirection(direction)).await;
}

#[when(expr = "{word} attaches a photo {string}")]
async fn attach_photo(world: &mut PayoutWorld, name: String, file: String) {
    send(world, &name, Role::Submitter, Payload::Attachment(Proof::photo(file))).await;
}

#[when(expr = "{word} is done")]
async fn done(world: &mut PayoutWorld, name: String) {
    send(world, &name, Role::Submitter, Payload::Done).await;
}

#[when(expr = "{word} cancels")]
async fn cancel(world: &mut PayoutWorld, name: String) {
    let actor = world.actor(&name);
    let outcome = world.api().cancel(actor, Role::Submitter).await;
    world.last_outcome = Some(Ok(outcome));
}

#[given(expr = "{word} has filed a request with link {string}")]
async fn file_request(world: &mut PayoutWorld, name: String, link: String) {
    start_request(world, name.clone()).await;
    let wallet = match world.outcome() {
        Ok(Outcome::Prompt(Prompt::SelectWallet(wallets))) => Payload::SelectWallet(wallets[0].id),
        _ => Payload::text("abc123XYZ"),
    };
    send(world, &name, Role::Submitter, wallet).await;
    send(world, &name, Role::Submitter, Payload::SelectDirection(Direction::OtcBot)).await;
    send(world, &name, Role::Submitter, Payload::text(link)).await;
    send(world, &name, Role::Submitter, Payload::Attachment(Proof::photo("photo-1"))).await;
    send(world, &name, Role::Submitter, Payload::Done).await;
    assert!(matches!(world.outcome(), Ok(Outcome::Completed(Completion::RequestCreated(_)))));
}

#[then(expr = "{word} is asked for a wallet address")]
async fn asked_for_wallet(world: &mut PayoutWorld, _name: String) {
    assert_eq!(world.outcome(), &Ok(Outcome::Prompt(Prompt::EnterWallet)));
}

#[then(expr = "{word} is asked to choose a direction")]
async fn asked_for_direction(world: &mut PayoutWorld, _name: String) {
    assert_eq!(world.outcome(), &Ok(Outcome::Prompt(Prompt::select_direction())));
}

#[then(expr = "{word} is re-prompted at {word}")]
async fn reprompted(world: &mut PayoutWorld, name: String, expected: String) {
    let expected = step(&expected);
    match world.outcome() {
        Ok(Outcome::Reprompt { step, .. }) => assert_eq!(*step, expected),
        other => panic!("Expected a re-prompt, got {other:?}"),
    }
    let actor = world.actor(&name);
    assert_eq!(world.api().current_step(actor, Role::Submitter).await, Some(expected));
}

#[then(expr = "{word} has no active flow")]
async fn no_active_flow(world: &mut PayoutWorld, name: String) {
    let actor = world.actor(&name);
    assert_eq!(world.api().current_step(actor, Role::Submitter).await, None);
}

#[then(expr = "{word} has {int} wallet(s), {int} of them active")]
async fn wallet_count(world: &mut PayoutWorld, name: String, total: usize, active: usize) {
    let actor = world.actor(&name);
    let wallets = world.api().list_wallets(actor).await.expect("Error fetching wallets");
    assert_eq!(wallets.len(), total);
    assert_eq!(wallets.iter().filter(|w| w.is_active).count(), active);
}

//--------------------------------------   Valuation flow    ---------------------------------------------------------
#[when(expr = "{word} starts pricing request #{int}")]
async fn start_pricing(world: &mut PayoutWorld, name: String, id: i64) {
    let admin = world.actor(&name);
    let outcome = world.api().begin_pricing(admin, id).await;
    world.last_outcome = Some(outcome);
}

#[when(expr = "{word} prices request #{int} at {string}")]
async fn price(world: &mut PayoutWorld, name: String, id: i64, amount: String) {
    start_pricing(world, name.clone(), id).await;
    assert!(world.outcome().is_ok(), "Could not start pricing: {:?}", world.outcome());
    send(world, &name, Role::Reviewer, Payload::text(amount)).await;
}

#[when(expr = "{word} rejects request #{int} because {string}")]
async fn reject(world: &mut PayoutWorld, name: String, id: i64, reason: String) {
    let admin = world.actor(&name);
    let outcome = world.api().begin_rejection(admin, id).await;
    assert!(outcome.is_ok(), "Could not start rejection: {outcome:?}");
    send(world, &name, Role::Reviewer, Payload::text(reason)).await;
}

#[when(expr = "{word} confirms payment of request #{int} with a photo {string}")]
async fn confirm_payment(world: &mut PayoutWorld, name: String, id: i64, file: String) {
    let admin = world.actor(&name);
    let outcome = world.api().begin_payment_confirmation(admin, id).await;
    assert!(outcome.is_ok(), "Could not start payment confirmation: {outcome:?}");
    send(world, &name, Role::Reviewer, Payload::Attachment(Proof::photo(file))).await;
}

#[then(expr = "request #{int} is {word} with amount {int} and worker percent {int}")]
async fn request_state(world: &mut PayoutWorld, id: i64, expected: String, amount: i64, percent: i64) {
    let request = fetch_request(world, id).await;
    assert_eq!(request.status, status(&expected));
    assert_eq!(request.total_amount, Amount::from_units(amount));
    assert_eq!(request.worker_percent, percent);
}

#[then(expr = "request #{int} is {word}")]
async fn request_status(world: &mut PayoutWorld, id: i64, expected: String) {
    let request = fetch_request(world, id).await;
    assert_eq!(request.status, status(&expected));
}

#[then(expr = "request #{int} was rejected because {string}")]
async fn rejection_reason(world: &mut PayoutWorld, id: i64, reason: String) {
    let request = fetch_request(world, id).await;
    assert_eq!(request.status, RequestStatus::Rejected);
    assert_eq!(request.rejection_reason, Some(reason));
}

#[then(expr = "request #{int} has {int} proof(s)")]
async fn proof_count(world: &mut PayoutWorld, id: i64, count: usize) {
    let request = fetch_request(world, id).await;
    assert_eq!(request.proofs.len(), count);
}

#[then(expr = "request #{int} splits into {int} for the worker and {int} for the operator")]
async fn split(world: &mut PayoutWorld, id: i64, worker: i64, operator: i64) {
    let request = fetch_request(world, id).await;
    assert_eq!(request.worker_share, Amount::from_units(worker));
    assert_eq!(request.operator_share, Amount::from_units(operator));
}

#[then(expr = "{word} has earned {int} from {int} profit(s)")]
async fn earnings(world: &mut PayoutWorld, name: String, total: i64, count: i64) {
    let actor = world.actor(&name);
    let actor = world.api().fetch_actor(actor).await.expect("Error fetching actor").expect("No such actor");
    assert_eq!(actor.total_earned, Amount::from_units(total));
    assert_eq!(actor.profits_count, count);
}

#[then("the action fails because the request is already final")]
async fn already_final(world: &mut PayoutWorld) {
    assert!(matches!(world.outcome(), Err(FlowError::Precondition(PreconditionFailed::AlreadyFinal(_)))));
}

#[then("the action fails because the request is already valued")]
async fn already_valued(world: &mut PayoutWorld) {
    assert!(matches!(world.outcome(), Err(FlowError::Precondition(PreconditionFailed::AlreadyValued(_)))));
}

#[then(expr = "the action fails because {word} is not an admin")]
async fn not_an_admin(world: &mut PayoutWorld, name: String) {
    let actor = world.actor(&name);
    assert_eq!(world.outcome(), &Err(FlowError::Precondition(PreconditionFailed::NotAnAdmin(actor))));
}
