// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic envswap-sync usage example.
//!
//! Demonstrates:
//! 1. Saving domain settings through the two-tier cache
//! 2. Reading them back (session hit, then sync hit after a restart)
//! 3. Writing a richer config directly to the store
//! 4. Filling the bucket space and watching it pack
//! 5. Displaying metrics captured by a debugging recorder
//!
//! # Run
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use std::sync::Arc;

use envswap_sync::storage::memory::InMemorySyncArea;
use envswap_sync::{
    DomainConfig, DomainSettings, Environment, Hostnames, Protocol, SessionCache, SettingsCache,
    SyncStore, SyncStoreConfig,
};
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║           envswap-sync: Basic Usage Example                   ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // Shared between "sessions" to stand in for the replicated area
    let area = Arc::new(InMemorySyncArea::new());

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Save settings
    // ─────────────────────────────────────────────────────────────────────────
    println!("📝 Saving settings...");
    let settings = SettingsCache::new(
        Arc::new(SessionCache::new()),
        SyncStore::new(Arc::clone(&area), SyncStoreConfig::default()),
    );

    let example = DomainSettings::new(".com", ".test", Protocol::Https, Protocol::Http);
    settings.save("example", example).await?;

    let mut acme = DomainSettings::new(".io", ".localhost", Protocol::Https, Protocol::Https);
    acme.prod_hostname = Some("acme".into());
    acme.local_hostname = Some("acme-web".into());
    settings.save("acme", acme).await?;
    println!("   ✓ example, acme (local alias acme-web)\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Read back
    // ─────────────────────────────────────────────────────────────────────────
    println!("🔍 Reading back...");
    let hit = settings.get("example").await?;
    println!("   session: example → {hit:?}");

    let restarted = SettingsCache::new(
        Arc::new(SessionCache::new()),
        SyncStore::new(Arc::clone(&area), SyncStoreConfig::default()),
    );
    let from_sync = restarted.get("acme-web").await?;
    println!("   sync:    acme-web → {from_sync:?}\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Rich config straight to the store
    // ─────────────────────────────────────────────────────────────────────────
    println!("🧩 Writing a three-environment config...");
    let mut shop = DomainConfig::new(
        vec![
            Environment::positional_default(0, false),
            Environment::positional_default(1, true),
            Environment::positional_default(2, true),
        ],
        Hostnames::Shared("shop.".into()),
    );
    shop.environments[0].port = 5173;
    shop.environments[2].tld = ".staging.dev".into();
    shop.environments[2].title = "Staging".into();
    restarted.store().write_config("shop.", &shop).await?;
    println!("   entry: {}\n", envswap_sync::entry::serialize(&shop)?);

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Fill the bucket space
    // ─────────────────────────────────────────────────────────────────────────
    println!("📦 Writing 400 more domains...");
    let store = restarted.store();
    for i in 0..400 {
        let base = format!("project-{i:03}");
        let mut config = shop.clone();
        config.hostnames = Hostnames::Shared(format!("{base}."));
        store.write_config(&format!("{base}."), &config).await?;
    }

    let usage = store.usage().await?;
    println!(
        "   {} entries in {}/{} buckets, {} bytes stored ({} bytes as JSON)",
        usage.entries, usage.buckets, usage.max_buckets, usage.stored_bytes, usage.uncompressed_bytes
    );
    for key in area.keys() {
        let len = area.raw(&key).map_or(0, |v| v.len());
        println!("   └─ {key}: {len} bytes");
    }
    println!();

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Metrics
    // ─────────────────────────────────────────────────────────────────────────
    println!("📊 Metrics:");
    let mut counters = Vec::new();
    let mut gauges = Vec::new();
    let mut histograms = Vec::new();

    for (composite_key, _, _, value) in snapshotter.snapshot().into_vec() {
        let (_, key) = composite_key.into_parts();
        let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
        let label_str = if labels.is_empty() { String::new() } else { format!("{{{}}}", labels.join(",")) };
        let name = format!("{}{}", key.name(), label_str);

        match value {
            DebugValue::Counter(v) => counters.push((name, v)),
            DebugValue::Gauge(v) => gauges.push((name, v.into_inner())),
            DebugValue::Histogram(samples) => {
                let count = samples.len();
                let sum: f64 = samples.iter().map(|v| v.into_inner()).sum();
                let avg = if count > 0 { sum / count as f64 } else { 0.0 };
                histograms.push((name, count, avg));
            }
        }
    }
    counters.sort_by(|a, b| a.0.cmp(&b.0));
    gauges.sort_by(|a, b| a.0.cmp(&b.0));
    histograms.sort_by(|a, b| a.0.cmp(&b.0));

    println!("   ┌─ Counters");
    for (name, value) in &counters {
        println!("   │  └─ {name} = {value}");
    }
    println!("   ├─ Gauges");
    for (name, value) in &gauges {
        println!("   │  └─ {name} = {value}");
    }
    println!("   └─ Histograms");
    for (name, count, avg) in &histograms {
        println!("      └─ {name}: n={count} avg={avg:.6}");
    }

    println!("\n✅ Done");
    Ok(())
}
