// all integration tests are bundled into a single binary, so that linking
// happens once
mod dashboard;
mod health_check;
mod helpers;
mod subscriptions;
