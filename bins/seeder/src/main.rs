//! Demo seeder for the Tally ledger.
//!
//! Drives a demo tenant through payments, a refund, a payout, a dispute and an
//! authorize/capture cycle against an in-memory ledger, then prints every
//! touched account's balance as JSON.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tally_core::ledger::{
    AccountType, Balance, Ledger, MemLedger, NewHold, PaymentOperations, names,
};
use tally_shared::AppConfig;

/// Demo tenant id.
const TENANT: &str = "tenant_demo";
/// Demo customers.
const CUSTOMERS: [&str; 2] = ["cust_alice", "cust_bob"];
/// Demo merchant.
const MERCHANT: &str = "merchant_acme";

/// One row of the printed report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountReport {
    name: String,
    #[serde(rename = "type")]
    account_type: AccountType,
    /// Posted balance in the account's natural sign.
    natural_balance: i64,
    balance: Balance,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=debug,seeder=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let currency = config.ledger.default_currency.clone();
    let ledger = MemLedger::with_config(config.ledger);

    info!(tenant_id = TENANT, "Seeding payments...");
    seed_payments(&ledger, &currency).await?;

    info!(tenant_id = TENANT, "Seeding refunds, payouts and disputes...");
    seed_adjustments(&ledger, &currency).await?;

    info!(tenant_id = TENANT, "Seeding holds...");
    seed_holds(&ledger).await?;

    let report = build_report(&ledger).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    info!("Seeding complete!");
    Ok(())
}

/// Records card payments, including one retried payment.
async fn seed_payments(ledger: &MemLedger, currency: &str) -> anyhow::Result<()> {
    let payments = [
        ("pi_1001", 10_000, CUSTOMERS[0], 320),
        ("pi_1002", 4_500, CUSTOMERS[1], 160),
        ("pi_1003", 2_000, CUSTOMERS[0], 0),
    ];
    for (intent, amount, customer, fees) in payments {
        let entry = ledger
            .record_payment(TENANT, intent, amount, currency, customer, fees)
            .await?;
        info!(entry_id = %entry.id, "{}", entry.description);
    }

    let original = ledger.find_account(TENANT, names::PLATFORM_CASH).await?;
    let before = ledger.get_balance(original.id, currency).await?;
    let replay = ledger
        .record_payment(TENANT, "pi_1001", 10_000, currency, CUSTOMERS[0], 320)
        .await?;
    let after = ledger.get_balance(original.id, currency).await?;
    anyhow::ensure!(
        before.posted_balance == after.posted_balance,
        "replayed payment changed platform cash"
    );
    info!(entry_id = %replay.id, "Replayed pi_1001 without effect");
    Ok(())
}

/// Records a refund, a merchant payout and a dispute.
async fn seed_adjustments(ledger: &MemLedger, currency: &str) -> anyhow::Result<()> {
    let refund = ledger
        .record_refund(TENANT, "re_2001", 1_500, currency, CUSTOMERS[1])
        .await?;
    info!(entry_id = %refund.id, "{}", refund.description);

    let payout = ledger
        .record_payout(TENANT, "po_3001", 6_000, currency, MERCHANT)
        .await?;
    info!(entry_id = %payout.id, "{}", payout.description);

    let dispute = ledger
        .record_dispute(TENANT, "dp_4001", 2_000, currency, CUSTOMERS[0])
        .await?;
    info!(entry_id = %dispute.id, "{}", dispute.description);
    Ok(())
}

/// Authorizes two holds on a customer balance, captures one partially and voids the other.
async fn seed_holds(ledger: &MemLedger) -> anyhow::Result<()> {
    let customer = ledger
        .find_account(TENANT, &names::customer_balance(CUSTOMERS[0]))
        .await?;

    let captured = ledger
        .create_hold(NewHold {
            payment_intent_id: Some("pi_1004".to_string()),
            ..NewHold::new(TENANT, customer.id, 2_500)
        })
        .await?;
    let voided = ledger
        .create_hold(NewHold::new(TENANT, customer.id, 700))
        .await?;

    let entry = ledger.capture_hold(captured.id, 2_000).await?;
    info!(hold_id = %captured.id, entry_id = %entry.id, "{}", entry.description);

    ledger.void_hold(voided.id).await?;
    info!(hold_id = %voided.id, "Voided hold");
    Ok(())
}

/// Collects the balance of every well-known account the demo touched.
async fn build_report(ledger: &MemLedger) -> anyhow::Result<Vec<AccountReport>> {
    let mut account_names = vec![
        names::PLATFORM_CASH.to_string(),
        names::PLATFORM_FEES.to_string(),
        names::PLATFORM_DISPUTES_HELD.to_string(),
        names::merchant_settlement(MERCHANT),
    ];
    account_names.extend(CUSTOMERS.iter().map(|c| names::customer_balance(c)));

    let mut report = Vec::with_capacity(account_names.len());
    for name in account_names {
        let account = ledger
            .find_account(TENANT, &name)
            .await
            .with_context(|| format!("account {name} was not provisioned"))?;
        for balance in ledger.list_balances(account.id).await? {
            report.push(AccountReport {
                name: account.name.clone(),
                account_type: account.account_type,
                natural_balance: account.normal_balance.natural(balance.posted_balance),
                balance,
            });
        }
    }
    Ok(report)
}
