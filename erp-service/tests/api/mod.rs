mod admin;
mod chat;
mod dashboard;
mod finance;
mod fiscal;
mod hr;
mod inventory;
mod maintenance;
mod orders;
mod pricing;
mod purchase;
mod support;
