#![forbid(unsafe_code)]

use std::collections::VecDeque;
use std::{io, time::Duration};

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
};
use tokio::net::TcpStream;
use tokio::time::interval;

use galecache_common::{DEFAULT_HOST, DEFAULT_PORT};
use galecache_protocol::{Connection, Frame as RespFrame};

#[derive(Parser, Debug)]
#[command(name = "galecache-monitor", about = "Monitor TUI do GaleCache")]
struct Args {
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

/// Última leitura de estatísticas do servidor.
#[derive(Default, Clone, Copy)]
struct Stats {
    record_count: i64,
    active_connections: i64,
}

struct App {
    data: VecDeque<(f64, f64)>,
    window_size: usize,
    x_offset: f64,
    last: Stats,
}

impl App {
    fn new() -> Self {
        Self {
            data: VecDeque::with_capacity(100),
            window_size: 100,
            x_offset: 0.0,
            last: Stats::default(),
        }
    }

    fn add_point(&mut self, stats: Stats) {
        self.x_offset += 1.0;
        if self.data.len() >= self.window_size {
            self.data.pop_front();
        }
        self.data.push_back((self.x_offset, stats.record_count as f64));
        self.last = stats;
    }

    fn to_dataset(&self) -> Vec<(f64, f64)> {
        self.data.iter().cloned().collect()
    }
}

/// Pede STATS e extrai os dois primeiros inteiros do array de resposta.
async fn poll_stats(conn: &mut Connection) -> Result<Stats> {
    let response = conn.round_trip(&RespFrame::array_from_strs(&["STATS"])).await?;
    match response {
        RespFrame::Array(values) => {
            let mut ints = values.iter().map(|f| f.as_integer());
            let record_count = ints.next().transpose()?.unwrap_or(0);
            let active_connections = ints.next().transpose()?.unwrap_or(0);
            Ok(Stats {
                record_count,
                active_connections,
            })
        }
        RespFrame::Error(msg) => Err(anyhow::anyhow!("servidor respondeu erro: {msg}")),
        other => Err(anyhow::anyhow!("resposta inesperada: {other:?}")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    // Setup Terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // App state
    let mut app = App::new();
    let mut ticker = interval(Duration::from_secs(1));

    // Connection loop
    let stream = TcpStream::connect(&addr).await?;
    let mut conn = Connection::new(stream);

    // UI Loop
    loop {
        // Draw
        terminal.draw(|f| ui(f, &app, &addr))?;

        // Handle Input (Non-blocking check)
        if event::poll(Duration::from_millis(0))?
            && let Event::Key(key) = event::read()?
                && key.code == KeyCode::Char('q') {
                    break;
                }

        // Update Data (Tick)
        tokio::select! {
            _ = ticker.tick() => {
                match poll_stats(&mut conn).await {
                    Ok(stats) => app.add_point(stats),
                    Err(_) => break,
                }
            }
        }
    }

    // Restore Terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}

fn ui(f: &mut Frame, app: &App, addr: &str) {
    let size = f.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(10), Constraint::Percentage(90)])
        .split(size);

    // Header
    let title = Paragraph::new(format!(
        "GaleCache Monitor - {} | registros: {} | conexões ao backend: {}",
        addr, app.last.record_count, app.last.active_connections
    ))
    .block(Block::default().borders(Borders::ALL).title("Status"))
    .style(Style::default().fg(Color::Cyan));
    f.render_widget(title, chunks[0]);

    // Chart
    let data_points = app.to_dataset();
    let dataset = vec![
        Dataset::default()
            .name("Registros")
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(Color::Yellow))
            .graph_type(GraphType::Line)
            .data(&data_points),
    ];

    let x_labels = vec![
        Span::styled(
            format!("{:.0}", app.x_offset - app.window_size as f64),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("{:.0}", app.x_offset),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ];

    let max_y = app.data.iter().map(|(_, y)| *y).fold(0.0, f64::max) + 10.0;

    let chart = Chart::new(dataset)
        .block(
            Block::default()
                .title("Registros ativos no backend")
                .borders(Borders::ALL),
        )
        .x_axis(
            Axis::default()
                .title("Tempo (s)")
                .style(Style::default().fg(Color::Gray))
                .bounds([app.x_offset - app.window_size as f64, app.x_offset])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title("Contagem")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, max_y])
                .labels(vec![
                    Span::raw("0"),
                    Span::styled(
                        format!("{:.0}", max_y),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                ]),
        );

    f.render_widget(chart, chunks[1]);
}
