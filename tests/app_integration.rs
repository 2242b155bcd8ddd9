use chrono::NaiveDate;
use nestegg::core::budget::BudgetForm;
use nestegg::core::config::{BenchmarkConfig, RetryPolicy};
use nestegg::core::fund::{CapStyle, Market};
use nestegg::core::holding::{HoldingForm, UserId};
use nestegg::providers::{ProfileProvider, YahooFinanceProvider};
use nestegg::store::{DiskStore, MemoryStore, Store};
use nestegg::{Finance, FundDirectory, NoticeLevel};
use rust_decimal::{Decimal, dec};
use std::fs;
use std::sync::Arc;
use tracing::info;

// Adds automatic logging to test
mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn mount_quote(server: &MockServer, symbol: &str, nav: f64) {
        let body = format!(
            r#"{{"chart": {{"result": [{{"meta": {{"regularMarketPrice": {nav}, "currency": "USD", "shortName": "{symbol} Fund"}}}}]}}}}"#
        );
        Mock::given(method("GET"))
            .and(path(format!("/v8/finance/chart/{symbol}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    pub async fn mount_profile(server: &MockServer, symbol: &str, profile: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/funds/{symbol}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(profile))
            .mount(server)
            .await;
    }

    /// One server answering both quote and profile requests for a 60/40
    /// fund (MIX) and the two default benchmarks.
    pub async fn create_mock_server() -> MockServer {
        let server = MockServer::start().await;
        mount_quote(&server, "MIX", 10.0).await;
        mount_quote(&server, "VT", 120.0).await;
        mount_quote(&server, "VXUS", 65.0).await;

        mount_profile(
            &server,
            "MIX",
            r#"{
                "name": "Sixty Forty Index",
                "domestic": 60,
                "international": 40,
                "cap_style": {"large_cap_blend": 70, "small_cap_value": 30},
                "regions": [
                    {"name": "United States", "percentage": 60},
                    {"name": "Europe", "percentage": 40}
                ],
                "sectors": [
                    {"name": "Technology", "percentage": 50},
                    {"name": "Financials", "percentage": 50}
                ]
            }"#,
        )
        .await;
        mount_profile(
            &server,
            "VT",
            r#"{
                "domestic": 62,
                "international": 38,
                "cap_style": {"large_cap_blend": 80, "small_cap_value": 20},
                "regions": [
                    {"name": "United States", "percentage": 62},
                    {"name": "Europe", "percentage": 23},
                    {"name": "Pacific", "percentage": 15}
                ],
                "sectors": [
                    {"name": "Technology", "percentage": 60},
                    {"name": "Financials", "percentage": 40}
                ]
            }"#,
        )
        .await;
        mount_profile(
            &server,
            "VXUS",
            r#"{
                "domestic": 0,
                "international": 100,
                "cap_style": {"large_cap_blend": 100},
                "regions": [
                    {"name": "Europe", "percentage": 61},
                    {"name": "Pacific", "percentage": 39}
                ],
                "sectors": [{"name": "Financials", "percentage": 100}]
            }"#,
        )
        .await;
        server
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 20).unwrap()
}

fn finance_on(store: Arc<dyn Store>, server: &wiremock::MockServer) -> Finance {
    let retry = RetryPolicy {
        retries: 0,
        delay_ms: 1,
    };
    let directory = FundDirectory::new(
        Arc::clone(&store),
        Arc::new(YahooFinanceProvider::new(&server.uri(), retry).unwrap()),
        Arc::new(ProfileProvider::new(&server.uri(), retry)),
        false,
    );
    Finance::new(store, directory, BenchmarkConfig::default(), "United States").with_clock(today)
}

fn shares(symbol: &str, shares: Decimal) -> HoldingForm {
    HoldingForm {
        symbol: symbol.to_string(),
        dollars_invested: None,
        shares: Some(shares),
    }
}

fn expense(item: &str, category: &str, amount: Decimal, month: u32) -> BudgetForm {
    BudgetForm {
        item: item.to_string(),
        category: category.to_string(),
        subcategory: "General".to_string(),
        amount,
        month,
    }
}

#[test_log::test(tokio::test)]
async fn test_portfolio_flow_with_mock() {
    let server = test_utils::create_mock_server().await;
    let store = Arc::new(MemoryStore::new());
    let finance = finance_on(store.clone(), &server);
    let alice = UserId::new("alice");

    assert!(finance.add_holding(&alice, &shares("mix", dec!(40))).await.is_success());
    let by_dollars = HoldingForm {
        symbol: "MIX".to_string(),
        dollars_invested: Some(dec!(600)),
        shares: None,
    };
    assert!(finance.add_holding(&alice, &by_dollars).await.is_success());

    let holdings = store.holdings(&alice).await.unwrap();
    assert_eq!(holdings.len(), 1);
    assert_eq!(holdings[0].shares, dec!(100));

    let view = finance.portfolio_view(&alice).await.unwrap();
    info!(?view, "Portfolio view");
    assert_eq!(view.portfolio.name, "alice's Portfolio");
    assert_eq!(view.breakdown.total_value, dec!(1000));
    assert_eq!(view.breakdown.markets[&Market::Domestic], dec!(60));
    assert_eq!(view.breakdown.markets[&Market::International], dec!(40));
    assert_eq!(view.breakdown.cap_style[&CapStyle::LargeCapBlend], dec!(70));
    assert_eq!(view.breakdown.holdings[0].percent, dec!(100));
    assert_eq!(view.international_regions["Europe"], dec!(100));
    assert!(view.notices.is_empty());

    let comparison = view.comparison.expect("benchmarks resolve");
    assert_eq!(comparison.total_market, "VT");
    let tech = comparison
        .sectors
        .iter()
        .find(|row| row.bucket == "Technology")
        .unwrap();
    assert_eq!((tech.portfolio, tech.benchmark), (dec!(50), dec!(60)));
    assert_eq!(comparison.international_regions[0].benchmark, dec!(61));
}

#[test_log::test(tokio::test)]
async fn test_holding_form_requires_exactly_one_amount() {
    let server = test_utils::create_mock_server().await;
    let store = Arc::new(MemoryStore::new());
    let finance = finance_on(store.clone(), &server);
    let alice = UserId::new("alice");
    let message = "Exactly one of 'Dollars Invested' or 'Shares' must be provided, but not both.";

    let both = HoldingForm {
        symbol: "MIX".to_string(),
        dollars_invested: Some(dec!(10)),
        shares: Some(dec!(1)),
    };
    let neither = HoldingForm {
        symbol: "MIX".to_string(),
        ..Default::default()
    };
    for form in [both, neither] {
        let notice = finance.add_holding(&alice, &form).await;
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, message);
    }
    assert!(store.holdings(&alice).await.unwrap().is_empty());
    assert!(store.fund("MIX").await.unwrap().is_none());
}

#[test_log::test(tokio::test)]
async fn test_other_users_records_are_untouched() {
    let server = test_utils::create_mock_server().await;
    let store = Arc::new(MemoryStore::new());
    let finance = finance_on(store.clone(), &server);
    let alice = UserId::new("alice");
    let mallory = UserId::new("mallory");

    finance.add_holding(&alice, &shares("MIX", dec!(5))).await;
    finance
        .add_budget_item(&alice, Some(2025), &expense("rent", "Need", dec!(900), 1))
        .await;
    let holding = store.holdings(&alice).await.unwrap().remove(0);
    let item = store.budget_items(&alice, None).await.unwrap().remove(0);

    let notice = finance.remove_holding(&mallory, holding.id).await;
    assert_eq!(
        notice.message,
        "You do not have permission to remove this holding."
    );
    let notice = finance.remove_budget_item(&mallory, item.id).await;
    assert_eq!(
        notice.message,
        "You do not have permission to remove this expense."
    );
    assert_eq!(store.holding(holding.id).await.unwrap(), Some(holding.clone()));
    assert_eq!(store.budget_item(item.id).await.unwrap(), Some(item.clone()));

    assert!(finance.remove_holding(&alice, holding.id).await.is_success());
    assert!(finance.remove_budget_item(&alice, item.id).await.is_success());
    assert!(store.holdings(&alice).await.unwrap().is_empty());
}

#[test_log::test(tokio::test)]
async fn test_budget_flow() {
    let server = test_utils::create_mock_server().await;
    let finance = finance_on(Arc::new(MemoryStore::new()), &server);
    let carol = UserId::new("carol");

    assert!(finance.set_income(&carol, "1000").await.is_success());
    for form in [
        expense("rent", "Need", dec!(200), 1),
        expense("concert", "want", dec!(100), 1),
        expense("rent", "Need", dec!(500), 2),
    ] {
        assert!(finance.add_budget_item(&carol, None, &form).await.is_success());
    }
    let rejected = finance
        .add_budget_item(&carol, None, &expense("", "Need", dec!(1), 1))
        .await;
    assert_eq!(rejected.message, "Error adding expense: Item is required");

    let january = finance.monthly_budget(&carol, 2025, 1).await.unwrap().summary();
    assert_eq!(january.month_name, "January");
    assert_eq!(january.total_spent, dec!(300));
    assert_eq!(january.total_needs, dec!(200));
    assert_eq!(january.total_wants, dec!(100));
    assert_eq!(january.savings, dec!(700));

    let march = finance.monthly_budget(&carol, 2025, 3).await.unwrap();
    assert!(march.is_empty());
    assert_eq!(march.savings(), dec!(1000));

    let view = finance.budget_view(&carol, None).await.unwrap();
    assert_eq!(view.income, dec!(1000));
    assert_eq!(view.year.months.len(), 2);
    assert_eq!(view.year.averages.months, 2);
    assert_eq!(view.year.averages.savings, dec!(600));
    assert_eq!(view.year.averages.total_spent, dec!(400));
}

#[test_log::test(tokio::test)]
async fn test_empty_portfolio_and_budget() {
    let server = test_utils::create_mock_server().await;
    let finance = finance_on(Arc::new(MemoryStore::new()), &server);
    let nobody = UserId::new("nobody");

    let view = finance.portfolio_view(&nobody).await.unwrap();
    assert_eq!(view.breakdown.total_value, Decimal::ZERO);
    assert!(view.breakdown.holdings.is_empty());
    assert!(view.breakdown.cap_style.values().all(|pct| pct.is_zero()));
    assert!(view.breakdown.regions.is_empty());
    assert!(view.international_regions.is_empty());
    assert!(view.comparison.is_none());

    let budget = finance.budget_view(&nobody, Some(2024)).await.unwrap();
    assert!(budget.year.months.is_empty());
    assert_eq!(budget.year.averages.savings, Decimal::ZERO);
    assert_eq!(budget.year.available_years, vec![2025]);
}

#[test_log::test(tokio::test)]
async fn test_disk_store_flow() {
    let server = test_utils::create_mock_server().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let alice = UserId::new("alice");

    {
        let store: Arc<dyn Store> = Arc::new(DiskStore::open(dir.path()).unwrap());
        let finance = finance_on(store, &server);
        assert!(finance.add_holding(&alice, &shares("MIX", dec!(3))).await.is_success());
        assert!(finance.add_holding(&alice, &shares("MIX", dec!(2))).await.is_success());
    }

    let store = Arc::new(DiskStore::open(dir.path()).unwrap());
    let holdings = store.holdings(&alice).await.unwrap();
    assert_eq!(holdings.len(), 1);
    assert_eq!(holdings[0].shares, dec!(5));
    assert_eq!(
        store.fund("MIX").await.unwrap().unwrap().name.as_deref(),
        Some("Sixty Forty Index")
    );
}

#[test_log::test(tokio::test)]
async fn test_open_from_config_file() {
    let server = test_utils::create_mock_server().await;
    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");

    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_path = config_file.path();
    let config_content = format!(
        r#"
        providers:
          yahoo:
            base_url: {0}
          profile:
            base_url: {0}
          retry:
            retries: 0
            delay_ms: 1
        data_path: {1}
    "#,
        server.uri(),
        data_dir.path().display()
    );
    fs::write(config_path, &config_content).expect("Failed to write config file");

    let finance = nestegg::open(Some(config_path.to_str().unwrap())).unwrap();
    let alice = UserId::new("alice");
    let notice = finance.add_holding(&alice, &shares("MIX", dec!(1))).await;
    assert!(notice.is_success(), "Adding holding failed with: {notice:?}");

    let view = finance.portfolio_view(&alice).await.unwrap();
    assert_eq!(view.breakdown.total_value, dec!(10));
    assert!(data_dir.path().join("store").exists());
}

#[test_log::test(tokio::test)]
async fn test_open_without_profile_provider_fails() {
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    fs::write(config_file.path(), "home_region: \"Canada\"\n").expect("Failed to write config file");

    let result = nestegg::open(Some(config_file.path().to_str().unwrap()));
    let err = result.err().expect("open should fail");
    assert!(err.to_string().contains("No fund profile provider configured"));
}
