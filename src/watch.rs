use std::{
    path::Path,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use anyhow::{Result, anyhow, bail};
use log::{debug, info, warn};

use crate::{
    cli::{InsightsArgs, WatchArgs},
    insights::{HttpInsightGenerator, InsightGenerator, InsightSettings, InsightState},
    report::RenderOptions,
    source::ConnectionState,
    summary::{Session, explain, print_report},
};

const TICK: Duration = Duration::from_millis(50);

pub fn execute(config_path: Option<&Path>, args: &WatchArgs) -> Result<()> {
    let mut session = Session::resolve(config_path, &args.source)?;
    if let Some(interval) = args.interval_ms {
        session.source = session
            .source
            .clone()
            .with_poll_interval(Duration::from_millis(interval));
    }
    let mut dashboard = session.dashboard();
    if args.insights {
        match http_generator(&session.config.insights) {
            Ok(generator) => dashboard = dashboard.with_generator(generator),
            Err(err) => warn!("Continuing without insights: {err:#}"),
        }
    }
    let options = RenderOptions {
        swatches: args.swatches,
    };

    dashboard.refresh().map_err(explain)?;
    dashboard.connect().map_err(explain)?;
    print_report(&dashboard, args.format, options)?;
    info!("Watching '{}' for inserted rows", session.table);

    let mut applied = 0usize;
    loop {
        thread::sleep(TICK);
        let received = dashboard.pump_live();
        let insights_changed = dashboard.poll_insights();
        if received > 0 || insights_changed {
            applied += received;
            debug!("Applied {received} live row(s), {applied} in total");
            print_report(&dashboard, args.format, options)?;
        }
        if args.max_updates.is_some_and(|max| applied >= max) {
            info!("Stopping after {applied} live row(s)");
            break;
        }
        if dashboard.connection_state() == Some(ConnectionState::Disconnected) {
            warn!("Live updates for '{}' ended", session.table);
            break;
        }
    }
    dashboard.cancel_insights();
    Ok(())
}

pub fn execute_insights(config_path: Option<&Path>, args: &InsightsArgs) -> Result<()> {
    let session = Session::resolve(config_path, &args.source)?;
    let generator = http_generator(&session.config.insights)?;
    let mut dashboard = session.dashboard().with_generator(generator);
    // The first load of a non-empty table starts the request on its own.
    dashboard.refresh().map_err(explain)?;
    if dashboard.snapshot().is_none() {
        println!("No data in '{}'.", session.table);
        return Ok(());
    }
    if !dashboard.insights_in_flight() && *dashboard.insights() == InsightState::NotRequested {
        dashboard.request_insights();
    }

    let deadline = Instant::now() + Duration::from_secs(args.wait_secs);
    while dashboard.insights_in_flight() {
        if dashboard.poll_insights() {
            break;
        }
        if Instant::now() >= deadline {
            dashboard.cancel_insights();
            bail!(
                "Insight service did not answer within {} second(s)",
                args.wait_secs
            );
        }
        thread::sleep(TICK);
    }
    print_report(&dashboard, args.format, RenderOptions::default())
}

fn http_generator(settings: &InsightSettings) -> Result<Arc<dyn InsightGenerator>> {
    let generator = HttpInsightGenerator::from_env(settings.clone())
        .map_err(|err| anyhow!("Configuring insight service: {err}"))?;
    Ok(Arc::new(generator))
}
