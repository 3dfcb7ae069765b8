use std::time::Duration;

use tabsync::demo::{simulate, Counter, SimulationOptions};

#[tokio::test(flavor = "current_thread")]
async fn tabs_converge_on_last_update() -> anyhow::Result<()> {
    let options = SimulationOptions {
        tabs: 4,
        updates: 6,
        tick: Duration::from_millis(2),
        ..Default::default()
    };

    let report = simulate(&options).await?;

    assert_eq!(report.tabs.len(), 4);
    assert!(report.converged());
    assert_eq!(report.errors(), 0);
    for tab in &report.tabs {
        assert_eq!(tab.state, Counter { count: 6 });
        assert!(tab.initialised);
    }
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn single_tab_keeps_its_own_value() -> anyhow::Result<()> {
    let options = SimulationOptions {
        tabs: 1,
        updates: 2,
        tick: Duration::from_millis(1),
        ..Default::default()
    };

    let report = simulate(&options).await?;

    assert_eq!(report.tabs[0].state, Counter { count: 2 });
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn zero_tabs_is_rejected() {
    let options = SimulationOptions {
        tabs: 0,
        ..Default::default()
    };

    assert!(simulate(&options).await.is_err());
}

#[tokio::test(flavor = "current_thread")]
async fn zero_tick_is_rejected() {
    let options = SimulationOptions {
        tabs: 2,
        updates: 1,
        tick: Duration::ZERO,
        ..Default::default()
    };

    let err = simulate(&options).await.unwrap_err();
    assert!(err.to_string().contains("tick"));
}
