//! Behavior-driven tests for chain fetching and caching workflows.
//!
//! These tests verify WHAT a user of the fetcher can accomplish against a
//! scripted Alpaca transport, focusing on observable behavior rather than
//! implementation details.

use std::sync::Arc;

use chainheat_core::{FetchError, SnapshotCache};
use chainheat_tests::*;
use tempfile::tempdir;

// =============================================================================
// Live fetch journeys
// =============================================================================

#[tokio::test]
async fn user_fetches_a_chain_and_contracts_are_normalized() {
    // Given: a venue with a stock quote, two listed contracts, and snapshots
    let client = Arc::new(
        ScriptedHttpClient::new()
            .ok(
                "/v2/stocks/AAPL/quotes/latest",
                stock_quote_body(189.9, 190.1),
            )
            .ok(
                "/v2/options/contracts",
                contracts_page_body(&["AAPL240621C00190000", "AAPL240621P00185000"], None),
            )
            .ok(
                "/v1beta1/options/snapshots",
                snapshots_body(&[
                    ("AAPL240621C00190000", 1_200, 340),
                    ("AAPL240621P00185000", 800, 120),
                ]),
            ),
    );
    let fetcher = ChainFetcher::new(client.clone(), test_credentials());
    let symbol = Symbol::parse("AAPL").expect("valid symbol");

    // When: the user fetches the chain
    let chain = fetcher
        .fetch(&symbol, &FetchParams::default())
        .await
        .expect("fetch should succeed");

    // Then: the snapshot carries the quote midpoint and normalized contracts
    assert_eq!(chain.underlying.as_str(), "AAPL");
    assert!((chain.underlying_price - 190.0).abs() < 1e-9);
    assert_eq!(chain.len(), 2);

    let call = chain.calls()[0];
    assert_eq!(call.option_type, OptionType::Call);
    assert!((call.strike - 190.0).abs() < f64::EPSILON);
    assert_eq!(call.open_interest, 1_200);
    assert_eq!(call.volume, 340);
    assert_eq!(call.delta, Some(0.5));
    assert_eq!(chain.puts().len(), 1);

    // And: every upstream request carried both Alpaca auth headers
    let requests = client.recorded_requests();
    assert!(!requests.is_empty());
    for request in &requests {
        assert_eq!(
            request.headers.get("apca-api-key-id").map(String::as_str),
            Some("key-id")
        );
        assert_eq!(
            request
                .headers
                .get("apca-api-secret-key")
                .map(String::as_str),
            Some("secret-key")
        );
    }

    // And: paper credentials routed the listing to the paper trading host
    assert!(requests
        .iter()
        .any(|r| r.url.starts_with("https://paper-api.alpaca.markets/v2/options/contracts")));
}

#[tokio::test]
async fn contract_listing_follows_pagination_tokens() {
    // Given: a listing split across two pages
    let client = Arc::new(
        ScriptedHttpClient::new()
            .ok(
                "page_token=next-1",
                contracts_page_body(&["AAPL240621C00200000"], None),
            )
            .ok(
                "/v2/options/contracts",
                contracts_page_body(
                    &["AAPL240621C00190000", "AAPL240621P00185000"],
                    Some("next-1"),
                ),
            )
            .ok(
                "/v2/stocks/AAPL/quotes/latest",
                stock_quote_body(189.9, 190.1),
            )
            .ok(
                "/v1beta1/options/snapshots",
                snapshots_body(&[
                    ("AAPL240621C00190000", 10, 1),
                    ("AAPL240621P00185000", 20, 2),
                    ("AAPL240621C00200000", 30, 3),
                ]),
            ),
    );
    let fetcher = ChainFetcher::new(client.clone(), test_credentials());
    let symbol = Symbol::parse("AAPL").expect("valid symbol");

    // When: the user fetches the chain
    let chain = fetcher
        .fetch(&symbol, &FetchParams::default())
        .await
        .expect("fetch should succeed");

    // Then: contracts from both pages are present
    assert_eq!(chain.len(), 3);

    // And: exactly two listing requests went upstream
    let listing_requests = client
        .recorded_requests()
        .into_iter()
        .filter(|r| r.url.contains("/v2/options/contracts"))
        .count();
    assert_eq!(listing_requests, 2);
}

#[tokio::test]
async fn failed_snapshot_batch_is_skipped_and_partial_chain_survives() {
    // Given: 120 listed contracts, where the second snapshot batch of 20
    // errors out upstream
    let occ_symbols: Vec<String> = (0..120)
        .map(|i| format!("AAPL240621C{:08}", (100 + i) * 1_000))
        .collect();
    let occ_refs: Vec<&str> = occ_symbols.iter().map(String::as_str).collect();
    let first_batch: Vec<(&str, u64, u64)> =
        occ_refs[..100].iter().map(|occ| (*occ, 50, 5)).collect();

    let client = Arc::new(
        ScriptedHttpClient::new()
            // 101st symbol only appears in the second batch URL
            .status(occ_refs[100], 500)
            .ok(
                "/v2/stocks/AAPL/quotes/latest",
                stock_quote_body(189.9, 190.1),
            )
            .ok("/v2/options/contracts", contracts_page_body(&occ_refs, None))
            .ok("/v1beta1/options/snapshots", snapshots_body(&first_batch)),
    );
    let fetcher = ChainFetcher::new(client, test_credentials());
    let symbol = Symbol::parse("AAPL").expect("valid symbol");

    // When: the user fetches the chain
    let chain = fetcher
        .fetch(&symbol, &FetchParams::default())
        .await
        .expect("fetch should still succeed");

    // Then: the surviving batch's contracts are all present
    assert_eq!(chain.len(), 100);
}

#[tokio::test]
async fn missing_stock_quote_fails_fast() {
    // Given: a venue that has no quote for the ticker
    let client = Arc::new(
        ScriptedHttpClient::new().ok("/v2/stocks/NOPE/quotes/latest", r#"{"symbol":"NOPE"}"#),
    );
    let fetcher = ChainFetcher::new(client, test_credentials());
    let symbol = Symbol::parse("NOPE").expect("valid symbol");

    // When/Then: the fetch fails before any listing request
    let error = fetcher
        .fetch(&symbol, &FetchParams::default())
        .await
        .expect_err("fetch must fail");
    assert!(matches!(error, FetchError::QuoteUnavailable { .. }));
}

#[tokio::test]
async fn listing_rejection_surfaces_the_upstream_status() {
    // Given: valid quote but a 403 from the trading API
    let client = Arc::new(
        ScriptedHttpClient::new()
            .ok(
                "/v2/stocks/AAPL/quotes/latest",
                stock_quote_body(189.9, 190.1),
            )
            .status("/v2/options/contracts", 403),
    );
    let fetcher = ChainFetcher::new(client, test_credentials());
    let symbol = Symbol::parse("AAPL").expect("valid symbol");

    // When/Then: the status code is preserved in the error
    let error = fetcher
        .fetch(&symbol, &FetchParams::default())
        .await
        .expect_err("fetch must fail");
    assert!(matches!(
        error,
        FetchError::UpstreamStatus { status: 403, .. }
    ));
}

// =============================================================================
// Cache journeys
// =============================================================================

#[tokio::test]
async fn fetched_chain_is_written_through_and_served_while_fresh() {
    // Given: a live fetch with write-through caching enabled
    let dir = tempdir().expect("tempdir");
    let client = Arc::new(
        ScriptedHttpClient::new()
            .ok(
                "/v2/stocks/AAPL/quotes/latest",
                stock_quote_body(189.9, 190.1),
            )
            .ok(
                "/v2/options/contracts",
                contracts_page_body(&["AAPL240621C00190000"], None),
            )
            .ok(
                "/v1beta1/options/snapshots",
                snapshots_body(&[("AAPL240621C00190000", 1_200, 340)]),
            ),
    );
    let fetcher =
        ChainFetcher::new(client, test_credentials()).with_cache(SnapshotCache::new(dir.path()));
    let symbol = Symbol::parse("AAPL").expect("valid symbol");
    let live = fetcher
        .fetch(&symbol, &FetchParams::default())
        .await
        .expect("fetch should succeed");

    // When: a fetcher with a dead transport asks for recent data
    let offline = ChainFetcher::new(Arc::new(ScriptedHttpClient::new()), test_credentials())
        .with_cache(SnapshotCache::new(dir.path()));
    let cached = offline
        .fetch_cached_or_live(&symbol, 15, &FetchParams::default())
        .await
        .expect("cache should satisfy the request");

    // Then: the cached chain is exactly what was fetched live
    assert_eq!(cached, live);
}

#[tokio::test]
async fn stale_cached_chain_triggers_a_live_fetch() {
    // Given: a cache holding only an old capture
    let dir = tempdir().expect("tempdir");
    let cache = SnapshotCache::new(dir.path());
    let old = chain_with("AAPL", 150.0, "2020-01-02T10:00:00Z", Vec::new());
    cache.save(&old).expect("seed cache");

    let client = Arc::new(
        ScriptedHttpClient::new()
            .ok(
                "/v2/stocks/AAPL/quotes/latest",
                stock_quote_body(189.9, 190.1),
            )
            .ok("/v2/options/contracts", contracts_page_body(&[], None)),
    );
    let fetcher =
        ChainFetcher::new(client, test_credentials()).with_cache(SnapshotCache::new(dir.path()));
    let symbol = Symbol::parse("AAPL").expect("valid symbol");

    // When: the user allows cached data up to 15 minutes old
    let chain = fetcher
        .fetch_cached_or_live(&symbol, 15, &FetchParams::default())
        .await
        .expect("live fetch should succeed");

    // Then: the stale entry was bypassed in favor of live data
    assert!((chain.underlying_price - 190.0).abs() < 1e-9);
}

#[tokio::test]
async fn live_credentials_route_listing_to_the_live_host() {
    // Given: credentials with paper trading disabled
    let client = Arc::new(
        ScriptedHttpClient::new()
            .ok(
                "/v2/stocks/SPY/quotes/latest",
                stock_quote_body(539.9, 540.1),
            )
            .ok("/v2/options/contracts", contracts_page_body(&[], None)),
    );
    let credentials = AlpacaCredentials::new("key-id", "secret-key", false);
    let fetcher = ChainFetcher::new(client.clone(), credentials);
    let symbol = Symbol::parse("SPY").expect("valid symbol");

    // When: the user fetches
    fetcher
        .fetch(&symbol, &FetchParams::default())
        .await
        .expect("fetch should succeed");

    // Then: the listing hit api.alpaca.markets, not the paper host
    assert!(client
        .recorded_requests()
        .iter()
        .any(|r| r.url.starts_with("https://api.alpaca.markets/v2/options/contracts")));
}
