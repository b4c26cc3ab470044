use std::fs;
use std::path::Path;

use ratemart::checks::QualityGate;
use ratemart::config::AppConfig;
use ratemart::core::currency::{CURRENCIES, rate_fact_columns};
use ratemart::core::error::PipelineError;
use ratemart::core::warehouse::Warehouse;
use ratemart::derive::DerivationEngine;
use ratemart::load::BulkLoader;
use ratemart::providers::exchange_api::ExchangeRateApi;
use ratemart::schema::{self, SchemaManager};
use ratemart::store::MemoryWarehouse;
use ratemart::{Pipeline, RunOptions, Stage};

mod test_utils {
    use ratemart::core::currency::CURRENCIES;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn history_body(base: &str) -> String {
        format!(
            r#"{{
                "base": "{base}",
                "rates": {{
                    "2020-01-02": {{"USD": 1.1193, "GBP": 0.8508}},
                    "2020-01-03": {{"USD": 1.1147, "GBP": 0.8545}}
                }}
            }}"#
        )
    }

    /// Mounts one successful history response per tracked currency.
    pub async fn create_rate_mock_server() -> MockServer {
        let mock_server = MockServer::start().await;
        for base in CURRENCIES {
            Mock::given(method("GET"))
                .and(path("/history"))
                .and(query_param("base", base))
                .respond_with(ResponseTemplate::new(200).set_body_string(history_body(base)))
                .mount(&mock_server)
                .await;
        }
        mock_server
    }

    /// Mounts a service that rejects the first start year for every
    /// currency before answering the advanced one.
    pub async fn create_sparse_rate_mock_server(rejected_year: i32) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/history"))
            .and(query_param("start_at", format!("{rejected_year}-01-01")))
            .respond_with(ResponseTemplate::new(400))
            .mount(&mock_server)
            .await;
        for base in CURRENCIES {
            Mock::given(method("GET"))
                .and(path("/history"))
                .and(query_param("start_at", format!("{}-01-01", rejected_year + 1)))
                .and(query_param("base", base))
                .respond_with(ResponseTemplate::new(200).set_body_string(history_body(base)))
                .mount(&mock_server)
                .await;
        }
        mock_server
    }
}

fn write_data_fixtures(data_dir: &Path) {
    let currencies = data_dir.join("currencies");
    fs::create_dir_all(&currencies).expect("Failed to create currencies dir");
    fs::write(
        currencies.join("currencies-meta.csv"),
        "USD,United States dollar,Cent,$\nEUR,Euro,Cent,€\nGBP,Pound sterling,Penny,£\n",
    )
    .expect("Failed to write currency reference fixture");

    let stocks = data_dir.join("stocks");
    fs::create_dir_all(&stocks).expect("Failed to create stocks dir");
    fs::write(
        stocks.join("aapl.us.txt"),
        "Date,Open,High,Low,Close,Volume,OpenInt\n\
         2017-11-01,169.87,169.94,165.61,166.89,33637762,0\n\
         2017-11-02,166.60,168.50,165.28,168.11,41393373,0\n",
    )
    .expect("Failed to write stock fixture");
    // An empty source file: skipped by the formatter, nothing loaded.
    fs::write(stocks.join("ghost.us.txt"), "").expect("Failed to write empty stock fixture");

    let etfs = data_dir.join("etfs");
    fs::create_dir_all(&etfs).expect("Failed to create etfs dir");
    fs::write(
        etfs.join("spy.us.txt"),
        "Date,Open,High,Low,Close,Volume,OpenInt\n\
         2017-11-01,257.19,257.62,256.52,257.49,71026306,0\n",
    )
    .expect("Failed to write ETF fixture");

    let commodities = data_dir.join("commodities");
    fs::create_dir_all(&commodities).expect("Failed to create commodities dir");
    fs::write(
        commodities.join("commodity_trade_statistics.csv"),
        "country_or_area,year,comm_code,commodity,flow,trade_usd,weight_kg,quantity_name,quantity,category\n\
         Afghanistan,2016,010410,\"Sheep, live\",Export,6088,2339,Number of items,51,01_live_animals\n\
         Albania,2016,010410,\"Sheep, live\",Import,2414,1265,Number of items,26,01_live_animals\n\
         Angola,2014,010511,\"Fowls, live domestic\",Import,127045,14086,Number of items,9602,01_live_animals\n",
    )
    .expect("Failed to write commodity fixture");
}

fn config_for(base_url: &str, data_dir: &Path, min_rows: u64) -> AppConfig {
    let yaml = format!(
        r#"
api:
  base_url: "{base_url}"
warehouse:
  dbname: "marts"
  user: "etl"
data_dir: "{}"
start_year: 2020
min_rows: {min_rows}
"#,
        data_dir.display()
    );
    serde_yaml::from_str(&yaml).expect("Failed to build test config")
}

fn all_options() -> RunOptions {
    RunOptions {
        teardown: true,
        format_price_files: true,
        format_commodities_files: true,
    }
}

#[test_log::test(tokio::test)]
async fn test_full_pipeline_run_succeeds() {
    let mock_server = test_utils::create_rate_mock_server().await;
    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_data_fixtures(data_dir.path());

    let config = config_for(&mock_server.uri(), data_dir.path(), 1);
    let warehouse = MemoryWarehouse::new();
    let provider = ExchangeRateApi::new(&mock_server.uri());

    let mut pipeline = Pipeline::new(&config, &warehouse, &provider);
    let result = pipeline.run(all_options()).await;
    assert!(result.is_ok(), "Pipeline failed with: {:?}", result.err());
    assert_eq!(pipeline.stage(), Stage::Succeeded);

    // 33 currencies x 2 observation dates.
    assert_eq!(
        warehouse
            .count_rows(schema::FACT_EXCHANGE_RATE, None)
            .await
            .unwrap(),
        66
    );
    assert_eq!(
        warehouse.count_rows(schema::DIM_CURRENCY, None).await.unwrap(),
        3
    );
    assert_eq!(
        warehouse.count_rows(schema::FACT_STOCK_PRICE, None).await.unwrap(),
        2
    );
    assert_eq!(
        warehouse.count_rows(schema::FACT_ETF_PRICE, None).await.unwrap(),
        1
    );
    assert_eq!(
        warehouse
            .count_rows(schema::FACT_COMMODITIES_STATS, None)
            .await
            .unwrap(),
        3
    );
    assert_eq!(
        warehouse.count_rows(schema::DIM_COMMODITY, None).await.unwrap(),
        2
    );

    // Rate dates and price dates, collapsed across fact tables.
    let dim_date = warehouse.rows(schema::DIM_DATE).await.unwrap();
    assert_eq!(dim_date.len(), 4);
    // 2020-01-02 was a Thursday (Sunday = 0) in Q1.
    let thursday = dim_date.iter().find(|row| row[0] == "2020-01-02").unwrap();
    assert_eq!(thursday[5], "1");
    assert_eq!(thursday[6], "4");
    // 2017-11-01 was a Wednesday in Q4.
    let wednesday = dim_date.iter().find(|row| row[0] == "2017-11-01").unwrap();
    assert_eq!(wednesday[5], "4");
    assert_eq!(wednesday[6], "3");
}

#[test_log::test(tokio::test)]
async fn test_pipeline_recovers_from_sparse_history_windows() {
    let mock_server = test_utils::create_sparse_rate_mock_server(2019).await;
    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_data_fixtures(data_dir.path());

    let mut config = config_for(&mock_server.uri(), data_dir.path(), 1);
    config.start_year = 2019;
    let warehouse = MemoryWarehouse::new();
    let provider = ExchangeRateApi::new(&mock_server.uri());

    let mut pipeline = Pipeline::new(&config, &warehouse, &provider);
    pipeline.run(all_options()).await.expect("Pipeline failed");

    assert_eq!(pipeline.stage(), Stage::Succeeded);
    assert_eq!(
        warehouse
            .count_rows(schema::FACT_EXCHANGE_RATE, None)
            .await
            .unwrap(),
        66
    );
}

#[test_log::test(tokio::test)]
async fn test_fatal_remote_status_aborts_the_run() {
    let mock_server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/history"))
        .respond_with(wiremock::ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_data_fixtures(data_dir.path());

    let config = config_for(&mock_server.uri(), data_dir.path(), 1);
    let warehouse = MemoryWarehouse::new();
    let provider = ExchangeRateApi::new(&mock_server.uri());

    let mut pipeline = Pipeline::new(&config, &warehouse, &provider);
    let error = pipeline.run(all_options()).await.unwrap_err();

    assert_eq!(pipeline.stage(), Stage::Failed);
    assert!(matches!(
        error.downcast_ref::<PipelineError>(),
        Some(PipelineError::RemoteFailure { status: 503, .. })
    ));
    assert_eq!(
        warehouse
            .count_rows(schema::FACT_EXCHANGE_RATE, None)
            .await
            .unwrap(),
        0
    );
}

/// Stage-level walk of the documented two-currency scenario: two currencies
/// observed over three distinct dates derive exactly three dimension rows,
/// and a minimum-rows gate of two passes on the four loaded fact rows.
#[test_log::test(tokio::test)]
async fn test_two_currency_fixture_derives_three_dimension_rows() {
    let warehouse = MemoryWarehouse::new();
    SchemaManager::new(&warehouse).teardown().await.unwrap();
    SchemaManager::new(&warehouse).initialize().await.unwrap();

    // EUR observed on 01-03 and 04-01, USD on 04-01 and 07-06.
    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let fixture = data_dir.path().join("rates.csv");
    let mut writer = csv::Writer::from_path(&fixture).unwrap();
    for (base, date) in [
        ("EUR", "2020-01-03"),
        ("EUR", "2020-04-01"),
        ("USD", "2020-04-01"),
        ("USD", "2020-07-06"),
    ] {
        let mut record = vec![base.to_string(), date.to_string()];
        record.extend(std::iter::repeat_n("1.0".to_string(), CURRENCIES.len()));
        writer.write_record(&record).unwrap();
    }
    writer.flush().unwrap();

    let loader = BulkLoader::new(&warehouse);
    let loaded = loader
        .load_file(&fixture, schema::FACT_EXCHANGE_RATE, &rate_fact_columns())
        .await
        .unwrap();
    assert_eq!(loaded, 4);

    let inserted = DerivationEngine::new(&warehouse)
        .derive_date_dimension(&[(schema::FACT_EXCHANGE_RATE, "observation_date")])
        .await
        .unwrap();
    assert_eq!(inserted, 3);

    let dim_date = warehouse.rows(schema::DIM_DATE).await.unwrap();
    assert_eq!(dim_date.len(), 3);
    // Friday of Q1, Wednesday of Q2, Monday of Q3 (Sunday = 0).
    let expectations = [
        ("2020-01-03", "1", "5"),
        ("2020-04-01", "2", "3"),
        ("2020-07-06", "3", "1"),
    ];
    for (date, quarter, day_of_week) in expectations {
        let row = dim_date.iter().find(|row| row[0] == date).unwrap();
        assert_eq!(row[5], quarter, "quarter of {date}");
        assert_eq!(row[6], day_of_week, "day of week of {date}");
    }

    QualityGate::new(&warehouse)
        .assert_minimum(schema::FACT_EXCHANGE_RATE, 2)
        .await
        .expect("Gate should pass with four fact rows");
}
