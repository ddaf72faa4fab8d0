/// Momentum Scanner
///
/// Shows the selected momentum tickers with colour coded indicator checks, and linked
/// price/MACD/RSI charts for the focused ticker.
use std::{
    error::Error,
    fs::OpenOptions,
    future::Future,
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::{DateTime, Local};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use momentum_core::{
    GREEN_CHECKS, Pane, Quality, StockStore, VisibleRange,
    chart::{BarColor, ChartPoint, HistogramPoint},
    classify::CheckSource,
    green_indicator_count,
};
use momentum_scanner::{
    ApiClient, App, ClientError, Command, ConnectionStatus, PushClient, PushConfig,
    ScannerConfig, Session, StoreInput, WriteOutcome, app::FocusedChart, apply_input,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table, Wrap},
};
use tokio::sync::{Mutex, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Results delivered back to the event loop.
#[derive(Debug)]
enum UiUpdate {
    Status(ConnectionStatus),
    /// Push session restarted and the store was cleared
    Reset,
    Loaded(usize),
    BuyFeatures(bool),
    Notice(String),
    Failed(ClientError),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = ScannerConfig::from_env()?;
    init_logging(&config.log_file)?;

    // Install rustls crypto provider (required for rustls 0.23+)
    let _ = rustls::crypto::ring::default_provider().install_default();

    // Setup panic hook to restore terminal on crash
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    let api = ApiClient::new(&config)?;
    let store = Arc::new(Mutex::new(StockStore::new()));

    let client = PushClient::with_config(
        PushConfig::new(config.ws_url.clone())
            .with_token(config.token.clone())
            .with_account_id(config.account_id.clone())
            .with_reconnect_delay(config.reconnect_delay)
            .with_channel_buffer_size(config.channel_buffer_size),
    );
    let (mut event_rx, mut status_rx) = client.start()?;

    let (store_tx, mut store_rx) = mpsc::channel::<StoreInput>(256);
    let (ui_tx, mut ui_rx) = mpsc::channel::<UiUpdate>(256);
    let session = Session::default();

    // Single writer: push events and REST results are applied in arrival order
    {
        let store = Arc::clone(&store);
        let ui_tx = ui_tx.clone();
        let session = session.clone();
        tokio::spawn(async move {
            loop {
                let input = tokio::select! {
                    Some(event) = event_rx.recv() => StoreInput::Channel(event),
                    Some(input) = store_rx.recv() => input,
                    else => break,
                };

                let outcome = {
                    let mut guard = store.lock().await;
                    apply_input(&mut guard, &session, input)
                };
                let update = match outcome {
                    WriteOutcome::Reset => Some(UiUpdate::Reset),
                    WriteOutcome::Loaded(count) => Some(UiUpdate::Loaded(count)),
                    WriteOutcome::Applied | WriteOutcome::Stale => None,
                };

                if let Some(update) = update {
                    if ui_tx.send(update).await.is_err() {
                        break;
                    }
                }
            }
        });
    }

    {
        let ui_tx = ui_tx.clone();
        tokio::spawn(async move {
            while let Some(status) = status_rx.recv().await {
                if ui_tx.send(UiUpdate::Status(status)).await.is_err() {
                    break;
                }
            }
        });
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config.selection);
    spawn_reload(&api, &session, &store_tx, &ui_tx);

    let tick_rate = config.tick_rate;
    let mut last_tick = Instant::now()
        .checked_sub(tick_rate)
        .unwrap_or_else(Instant::now);

    loop {
        while let Ok(update) = ui_rx.try_recv() {
            match update {
                UiUpdate::Status(status) => app.status = status,
                UiUpdate::Reset => {
                    info!("Push session restarted, reloading snapshot");
                    app.reset();
                    spawn_reload(&api, &session, &store_tx, &ui_tx);
                }
                UiUpdate::Loaded(count) => {
                    info!("Loaded {} stock records", count);
                    app.last_error = None;
                }
                UiUpdate::BuyFeatures(enabled) => app.buy_features = Some(enabled),
                UiUpdate::Notice(notice) => app.notice = Some(notice),
                UiUpdate::Failed(e) => app.last_error = Some(e),
            }
        }

        if last_tick.elapsed() >= tick_rate {
            let snapshot = {
                let guard = store.lock().await;
                guard.snapshot()
            };
            let command = app.refresh(snapshot);
            run_command(command, &api, &session, &store_tx, &ui_tx);

            terminal.draw(|f| render_ui(f, &app))?;
            last_tick = Instant::now();
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match app.handle_key(key.code) {
                    Command::Quit => break,
                    command => run_command(command, &api, &session, &store_tx, &ui_tx),
                }
                terminal.draw(|f| render_ui(f, &app))?;
            }
        }
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Log to a file; stdout belongs to the terminal UI.
fn init_logging(path: &str) -> Result<(), Box<dyn Error>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run_command(
    command: Command,
    api: &ApiClient,
    session: &Session,
    store_tx: &mpsc::Sender<StoreInput>,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match command {
        Command::Retry => spawn_reload(api, session, store_tx, ui_tx),
        Command::LoadCandles(ticker) => spawn_store_request(api, session, store_tx, ui_tx, |api, generation| async move {
            let event = api.candles(&ticker).await?;
            Ok::<_, ClientError>(StoreInput::Event { generation, event })
        }),
        Command::ToggleBuyFeatures(enabled) => spawn_ui_request(api, ui_tx, move |api| async move {
            api.toggle_buy_features(enabled).await.map(UiUpdate::BuyFeatures)
        }),
        Command::ExitPosition(ticker) => {
            info!("Requesting exit for {}", ticker);
            spawn_exit(api, session, store_tx, ui_tx, ticker);
        }
        Command::Quit | Command::None => {}
    }
}

/// Exit, then apply the reloaded positions before reporting the exit as submitted.
fn spawn_exit(
    api: &ApiClient,
    session: &Session,
    store_tx: &mpsc::Sender<StoreInput>,
    ui_tx: &mpsc::Sender<UiUpdate>,
    ticker: String,
) {
    let api = api.clone();
    let generation = session.current();
    let store_tx = store_tx.clone();
    let ui_tx = ui_tx.clone();
    tokio::spawn(async move {
        match api.exit_and_reload_positions(&ticker).await {
            Ok(event) => {
                if store_tx.send(StoreInput::Event { generation, event }).await.is_err() {
                    return;
                }
                let _ = ui_tx
                    .send(UiUpdate::Notice(format!("Exit submitted for {ticker}")))
                    .await;
            }
            Err(e) => {
                error!("{}", e);
                let _ = ui_tx.send(UiUpdate::Failed(e)).await;
            }
        }
    });
}

/// Load the full REST snapshot; each request fails independently.
fn spawn_reload(
    api: &ApiClient,
    session: &Session,
    store_tx: &mpsc::Sender<StoreInput>,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    spawn_store_request(api, session, store_tx, ui_tx, |api, generation| async move {
        let records = api.stock_data().await?;
        Ok::<_, ClientError>(StoreInput::Snapshot { generation, records })
    });
    spawn_store_request(api, session, store_tx, ui_tx, |api, generation| async move {
        let event = api.market_context().await?;
        Ok::<_, ClientError>(StoreInput::Event { generation, event })
    });
    spawn_store_request(api, session, store_tx, ui_tx, |api, generation| async move {
        let event = api.positions().await?;
        Ok::<_, ClientError>(StoreInput::Event { generation, event })
    });
    spawn_ui_request(api, ui_tx, |api| async move {
        api.buy_features_status().await.map(UiUpdate::BuyFeatures)
    });
}

/// Run a REST request tagged with the current push session generation.
fn spawn_store_request<F, Fut>(
    api: &ApiClient,
    session: &Session,
    store_tx: &mpsc::Sender<StoreInput>,
    ui_tx: &mpsc::Sender<UiUpdate>,
    request: F,
) where
    F: FnOnce(ApiClient, u64) -> Fut,
    Fut: Future<Output = Result<StoreInput, ClientError>> + Send + 'static,
{
    let future = request(api.clone(), session.current());
    let store_tx = store_tx.clone();
    let ui_tx = ui_tx.clone();
    tokio::spawn(async move {
        match future.await {
            Ok(input) => {
                let _ = store_tx.send(input).await;
            }
            Err(e) => {
                warn!("{}", e);
                let _ = ui_tx.send(UiUpdate::Failed(e)).await;
            }
        }
    });
}

fn spawn_ui_request<F, Fut>(api: &ApiClient, ui_tx: &mpsc::Sender<UiUpdate>, request: F)
where
    F: FnOnce(ApiClient) -> Fut,
    Fut: Future<Output = Result<UiUpdate, ClientError>> + Send + 'static,
{
    let future = request(api.clone());
    let ui_tx = ui_tx.clone();
    tokio::spawn(async move {
        let update = future.await.unwrap_or_else(|e| {
            error!("{}", e);
            UiUpdate::Failed(e)
        });
        let _ = ui_tx.send(update).await;
    });
}

fn render_ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(1),
        ])
        .split(f.area());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9),
            Constraint::Percentage(50),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(body[1]);

    render_header(f, app, chunks[0]);
    render_selection(f, app, body[0]);
    render_detail(f, app, right[0]);

    let chart = app.chart.as_ref();
    render_price_chart(f, chart, right[1]);
    render_macd_chart(f, chart, right[2]);
    render_rsi_chart(f, chart, right[3]);

    let help = Paragraph::new(Line::from(Span::styled(
        " q quit  ↑/↓ focus  ←/→ pan  +/- zoom  r reload  b buy features  x exit position",
        Style::default().fg(Color::DarkGray),
    )));
    f.render_widget(help, chunks[2]);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let (status, status_color) = match app.status {
        ConnectionStatus::Connected => ("LIVE", Color::Green),
        ConnectionStatus::Reconnecting => ("RECONNECTING", Color::Yellow),
        ConnectionStatus::Disconnected => ("OFFLINE", Color::Red),
    };

    let mut spans = vec![
        Span::styled(
            format!(" {status} "),
            Style::default()
                .fg(status_color)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " {} tickers  {} shown ",
            app.snapshot.len(),
            app.selection.len()
        )),
    ];

    if let Some(context) = app.snapshot.market_context.as_deref() {
        let score = context.score.unwrap_or(0.0);
        spans.push(Span::styled(
            format!(
                " Market {:.0} {} ",
                score,
                context.signal.as_deref().unwrap_or("-")
            ),
            Style::default().fg(if score >= 60.0 {
                Color::Green
            } else if score >= 40.0 {
                Color::Yellow
            } else {
                Color::Red
            }),
        ));
    }

    let (buy, buy_color) = match app.buy_features {
        Some(true) => ("BUY ON", Color::Green),
        Some(false) => ("BUY OFF", Color::Red),
        None => ("BUY ?", Color::Gray),
    };
    spans.push(Span::styled(format!(" {buy} "), Style::default().fg(buy_color)));
    spans.push(Span::raw(format!(
        " {} positions ",
        app.snapshot.positions.len()
    )));
    spans.push(Span::styled(
        Local::now().format(" %H:%M:%S ").to_string(),
        Style::default().fg(Color::Gray),
    ));

    if let Some(e) = &app.last_error {
        let hint = if e.is_retryable() { " (r to retry)" } else { "" };
        spans.push(Span::styled(
            format!(" Failed to load: {e}{hint}"),
            Style::default().fg(Color::Red),
        ));
    } else if let Some(notice) = &app.notice {
        spans.push(Span::styled(
            format!(" {notice}"),
            Style::default().fg(Color::Cyan),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .title(" MOMENTUM SCANNER ")
            .borders(Borders::ALL),
    );
    f.render_widget(header, area);
}

fn render_selection(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" SELECTION ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White));

    let header_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let mut header = vec![
        Cell::from("Ticker"),
        Cell::from("Tags"),
        Cell::from("Price"),
        Cell::from("Chg%"),
    ];
    header.extend(GREEN_CHECKS.iter().map(|check| Cell::from(check.label)));
    header.push(Cell::from("G"));
    let header = Row::new(header).style(header_style);

    let rows = app
        .selection
        .iter()
        .enumerate()
        .filter_map(|(index, (ticker, tags))| {
            let record = app.snapshot.get(ticker)?;
            let change = record.percent_change();

            let mut cells = vec![
                Cell::from(format!(
                    "{}{}{}",
                    ticker,
                    if record.fire_emoji_status == Some(true) { "🔥" } else { "" },
                    if record.explosion_emoji_status == Some(true) { "💥" } else { "" },
                ))
                .style(Style::default().add_modifier(Modifier::BOLD)),
                Cell::from(tags.iter().map(|tag| tag_symbol(tag.as_str())).collect::<String>()),
                Cell::from(format_price(record.price)),
                Cell::from(
                    change
                        .map(|c| format!("{:+.1}", c * 100.0))
                        .unwrap_or_else(|| "-".to_string()),
                )
                .style(Style::default().fg(match change {
                    Some(c) if c > 0.0 => Color::Green,
                    Some(c) if c < 0.0 => Color::Red,
                    _ => Color::Gray,
                })),
            ];

            cells.extend(GREEN_CHECKS.iter().map(|check| {
                Cell::from(format_check(&check.source, check.source.read(record)))
                    .style(Style::default().fg(quality_color(check.quality(record))))
            }));

            let green = green_indicator_count(record);
            cells.push(Cell::from(green.to_string()).style(
                Style::default()
                    .fg(if green == GREEN_CHECKS.len() {
                        Color::Green
                    } else {
                        Color::White
                    })
                    .add_modifier(Modifier::BOLD),
            ));

            let row = Row::new(cells);
            Some(if index == app.focus_index() {
                row.style(Style::default().bg(Color::DarkGray))
            } else {
                row
            })
        })
        .collect::<Vec<_>>();

    let mut widths = vec![
        Constraint::Length(8),
        Constraint::Length(6),
        Constraint::Length(8),
        Constraint::Length(6),
    ];
    widths.extend(GREEN_CHECKS.iter().map(|_| Constraint::Length(6)));
    widths.push(Constraint::Length(3));

    let table = Table::new(rows, widths).header(header).block(block);
    f.render_widget(table, area);
}

fn render_detail(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(format!(" {} ", app.focused_ticker().unwrap_or("DETAIL")))
        .borders(Borders::ALL);

    let Some(record) = app.focused_record() else {
        let empty = Paragraph::new("No ticker selected")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(empty, area);
        return;
    };

    let mut lines = vec![Line::from(vec![
        Span::styled(
            format_price(record.price),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            "  vol {}  float {}",
            format_large(record.volume),
            format_large(record.float_share)
        )),
        Span::styled(
            format!(
                "  score {}",
                record
                    .technical_score()
                    .map(|s| format!("{:.0}%", s * 100.0))
                    .unwrap_or_else(|| "-".to_string())
            ),
            Style::default().fg(quality_color(momentum_core::classify(
                "technical_score",
                record.technical_score()
            ))),
        ),
    ])];

    if let Some(book) = &record.orderbook {
        let level = |level: Option<&momentum_core::types::BookLevel>| {
            level
                .map(|l| format!("{:.2} x {:.0}", l.price, l.size))
                .unwrap_or_else(|| "-".to_string())
        };
        lines.push(Line::from(vec![
            Span::styled(format!("Bid {}", level(book.best_bid.as_ref())), Style::default().fg(Color::Green)),
            Span::raw("  "),
            Span::styled(format!("Ask {}", level(book.best_ask.as_ref())), Style::default().fg(Color::Red)),
            Span::raw(
                book.spread_percentage()
                    .map(|s| format!("  spread {s:.2}%"))
                    .unwrap_or_default(),
            ),
        ]));
    }

    if let Some(strategy) = &record.strategy {
        lines.push(Line::from(vec![
            Span::styled(
                format!(
                    "{} [{}]",
                    strategy.name.as_deref().unwrap_or("strategy"),
                    strategy.state.as_deref().unwrap_or("-")
                ),
                Style::default().fg(Color::Magenta),
            ),
            Span::raw(format!(
                "  entry {}  stop {}  target {}",
                format_price(strategy.entry_price),
                format_price(strategy.stop_price),
                format_price(strategy.target_price)
            )),
        ]));
    }

    if let Some(narrative) = &record.narrative {
        if let Some(message) = &narrative.message {
            lines.push(Line::from(Span::styled(
                message.clone(),
                Style::default().fg(Color::White),
            )));
        }
        if let Some(reason) = &narrative.warning_reason {
            lines.push(Line::from(Span::styled(
                format!("⚠ {reason}"),
                Style::default().fg(Color::Yellow),
            )));
        }
    }

    for note in record.market_notes.iter().flatten().take(2) {
        lines.push(Line::from(Span::styled(
            note.message.clone(),
            Style::default().fg(Color::Gray),
        )));
    }

    let detail = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(block);
    f.render_widget(detail, area);
}

fn render_price_chart(f: &mut Frame, chart: Option<&FocusedChart>, area: Rect) {
    let block = Block::default().title(" PRICE ").borders(Borders::ALL);
    let Some((chart, range)) = visible(chart, Pane::Price) else {
        f.render_widget(empty_chart(block), area);
        return;
    };

    let close = chart
        .series
        .candles
        .iter()
        .filter(|c| range.contains(c.time))
        .map(|c| (c.time as f64, c.close))
        .collect::<Vec<_>>();
    let vwap = line_points(&chart.series.vwap, range);
    let ema200 = line_points(&chart.series.ema200, range);

    let datasets = vec![
        line_dataset("close", &close, Color::White),
        line_dataset("vwap", &vwap, Color::Yellow),
        line_dataset("ema200", &ema200, Color::Magenta),
    ];
    let bounds = value_bounds([close.as_slice(), vwap.as_slice(), ema200.as_slice()]);
    render_chart(f, block, datasets, range, bounds, area);
}

fn render_macd_chart(f: &mut Frame, chart: Option<&FocusedChart>, area: Rect) {
    let block = Block::default().title(" MACD ").borders(Borders::ALL);
    let Some((chart, range)) = visible(chart, Pane::Macd) else {
        f.render_widget(empty_chart(block), area);
        return;
    };

    let macd = line_points(&chart.series.macd, range);
    let signal = line_points(&chart.series.macd_signal, range);
    let rising = histogram_points(&chart.series.macd_histogram, range, BarColor::Green);
    let falling = histogram_points(&chart.series.macd_histogram, range, BarColor::Red);

    let datasets = vec![
        bar_dataset(&rising, Color::Green),
        bar_dataset(&falling, Color::Red),
        line_dataset("macd", &macd, Color::Cyan),
        line_dataset("signal", &signal, Color::Yellow),
    ];
    let bounds = value_bounds([
        macd.as_slice(),
        signal.as_slice(),
        rising.as_slice(),
        falling.as_slice(),
    ]);
    render_chart(f, block, datasets, range, bounds, area);
}

fn render_rsi_chart(f: &mut Frame, chart: Option<&FocusedChart>, area: Rect) {
    let block = Block::default().title(" RSI ").borders(Borders::ALL);
    let Some((chart, range)) = visible(chart, Pane::Rsi) else {
        f.render_widget(empty_chart(block), area);
        return;
    };

    let rsi = line_points(&chart.series.rsi, range);
    let overbought = [(range.from as f64, 70.0), (range.to as f64, 70.0)];
    let oversold = [(range.from as f64, 30.0), (range.to as f64, 30.0)];

    let datasets = vec![
        line_dataset("", &overbought, Color::DarkGray),
        line_dataset("", &oversold, Color::DarkGray),
        line_dataset("rsi", &rsi, Color::LightBlue),
    ];
    render_chart(f, block, datasets, range, [0.0, 100.0], area);
}

fn visible(chart: Option<&FocusedChart>, pane: Pane) -> Option<(&FocusedChart, VisibleRange)> {
    let chart = chart.filter(|chart| !chart.series.is_empty())?;
    Some((chart, chart.sync.range(pane)?))
}

fn empty_chart(block: Block<'_>) -> Paragraph<'_> {
    Paragraph::new("No candles")
        .style(Style::default().fg(Color::DarkGray))
        .block(block)
}

fn line_points(points: &[ChartPoint], range: VisibleRange) -> Vec<(f64, f64)> {
    points
        .iter()
        .filter(|p| range.contains(p.time))
        .map(|p| (p.time as f64, p.value))
        .collect()
}

fn histogram_points(points: &[HistogramPoint], range: VisibleRange, color: BarColor) -> Vec<(f64, f64)> {
    points
        .iter()
        .filter(|p| p.color == color && range.contains(p.time))
        .map(|p| (p.time as f64, p.value))
        .collect()
}

/// Unnamed datasets are left out of the legend.
fn line_dataset<'a>(name: &'a str, data: &'a [(f64, f64)], color: Color) -> Dataset<'a> {
    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(data);
    if name.is_empty() { dataset } else { dataset.name(name) }
}

fn bar_dataset(data: &[(f64, f64)], color: Color) -> Dataset<'_> {
    Dataset::default()
        .marker(symbols::Marker::HalfBlock)
        .graph_type(GraphType::Bar)
        .style(Style::default().fg(color))
        .data(data)
}

/// Min/max over all points with a small margin, `[0, 1]` when empty.
fn value_bounds<const N: usize>(series: [&[(f64, f64)]; N]) -> [f64; 2] {
    let (min, max) = series
        .iter()
        .flat_map(|points| points.iter().map(|(_, y)| *y))
        .filter(|y| y.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), y| {
            (min.min(y), max.max(y))
        });

    if min > max {
        return [0.0, 1.0];
    }
    let margin = ((max - min) * 0.05).max(1e-6);
    [min - margin, max + margin]
}

fn render_chart(
    f: &mut Frame,
    block: Block<'_>,
    datasets: Vec<Dataset<'_>>,
    range: VisibleRange,
    bounds: [f64; 2],
    area: Rect,
) {
    let x_axis = Axis::default()
        .style(Style::default().fg(Color::Gray))
        .bounds([range.from as f64, range.to as f64])
        .labels([time_label(range.from), time_label(range.to)]);
    let y_axis = Axis::default()
        .style(Style::default().fg(Color::Gray))
        .bounds(bounds)
        .labels([format!("{:.2}", bounds[0]), format!("{:.2}", bounds[1])]);

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(x_axis)
        .y_axis(y_axis);
    f.render_widget(chart, area);
}

fn time_label(time: i64) -> String {
    DateTime::from_timestamp(time, 0)
        .map(|utc| utc.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_default()
}

fn tag_symbol(tag: &str) -> &'static str {
    match tag {
        "all_green" => "G",
        "rapid_5green" => "R5",
        "top_5m" => "5m",
        "session_gainer" => "S",
        "rapid" => "R",
        "vwap_candidate" => "V",
        _ => "?",
    }
}

fn quality_color(quality: Quality) -> Color {
    match quality {
        Quality::Excellent => Color::Green,
        Quality::Good => Color::LightGreen,
        Quality::Moderate => Color::Yellow,
        Quality::Poor => Color::Red,
        Quality::Neutral => Color::DarkGray,
    }
}

fn format_check(source: &CheckSource, value: Option<f64>) -> String {
    match (source, value) {
        (_, None) => "-".to_string(),
        (CheckSource::TechnicalScore, Some(v)) => format!("{:.0}%", v * 100.0),
        (CheckSource::FloatShare, v) => format_large(v),
        (CheckSource::Indicator(_), Some(v)) => format!("{v:.2}"),
    }
}

fn format_price(price: Option<f64>) -> String {
    price
        .map(|p| format!("${p:.2}"))
        .unwrap_or_else(|| "-".to_string())
}

fn format_large(value: Option<f64>) -> String {
    match value {
        Some(v) if v >= 1e9 => format!("{:.1}B", v / 1e9),
        Some(v) if v >= 1e6 => format!("{:.1}M", v / 1e6),
        Some(v) if v >= 1e3 => format!("{:.1}K", v / 1e3),
        Some(v) => format!("{v:.0}"),
        None => "-".to_string(),
    }
}
