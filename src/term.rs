use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{BufWriter, IsTerminal, Stdout, Write, stdout};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::background::viewport::WindowMetrics;
use crate::config::TerminalSettings;
use crate::driver::{AnimationDriver, FrameHost, FrameId, ListenerId, Scene};
use crate::raster::Raster;

/// Drives a scene on the terminal: every cell is an upper half block, so
/// one cell shows two vertically stacked samples of the frame.
pub struct TerminalHost {
    stdout: BufWriter<Stdout>,
    settings: TerminalSettings,
    cols: u16,
    rows: u16,
    cell: (f64, f64),
    started: Instant,
    frame_interval: Duration,
    last_frame: Option<Instant>,
    next_id: u64,
    pending: Option<(FrameId, Instant)>,
    listeners: Vec<ListenerId>,
    output_buf: Vec<u8>,
    cells: Vec<(u8, u8, u8)>,
    entered: bool,
}

impl TerminalHost {
    /// Measures the terminal without touching its mode.
    pub fn new(settings: &TerminalSettings, fps: u32) -> Self {
        let (cols, rows) = terminal::size().unwrap_or((0, 0));
        let mut host = Self {
            stdout: BufWriter::with_capacity(1024 * 64, stdout()),
            settings: settings.clone(),
            cols,
            rows,
            cell: (settings.cell_width, settings.cell_height),
            started: Instant::now(),
            frame_interval: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
            last_frame: None,
            next_id: 0,
            pending: None,
            listeners: Vec::new(),
            output_buf: Vec::new(),
            cells: Vec::new(),
            entered: false,
        };
        host.measure_cells();
        host
    }

    // Prefer the real cell size when the terminal reports its pixel size
    fn measure_cells(&mut self) {
        self.cell = match terminal::window_size() {
            Ok(size) if size.width > 0 && size.height > 0 && size.columns > 0 && size.rows > 0 => (
                size.width as f64 / size.columns as f64,
                size.height as f64 / size.rows as f64,
            ),
            _ => (self.settings.cell_width, self.settings.cell_height),
        };
    }

    pub fn enter(&mut self) -> std::io::Result<()> {
        terminal::enable_raw_mode()?;
        self.entered = true;
        execute!(self.stdout, EnterAlternateScreen, Hide, Clear(ClearType::All))?;
        Ok(())
    }

    pub fn leave(&mut self) -> std::io::Result<()> {
        if !self.entered {
            return Ok(());
        }
        self.entered = false;
        execute!(self.stdout, Show, LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    /// Pump input and frame deadlines until the driver has nothing pending.
    pub fn run<S: Scene>(&mut self, driver: &mut AnimationDriver<S>) -> std::io::Result<()> {
        while let Some((id, deadline)) = self.pending {
            let timeout = deadline.saturating_duration_since(Instant::now());
            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if is_quit(&key) => driver.unmount(self),
                    Event::Resize(cols, rows) => {
                        self.cols = cols;
                        self.rows = rows;
                        self.measure_cells();
                        if !self.listeners.is_empty() {
                            driver.on_resize(&*self);
                        }
                        execute!(self.stdout, Clear(ClearType::All))?;
                    }
                    _ => {}
                }
                continue;
            }

            self.pending = None;
            let now = Instant::now();
            self.last_frame = Some(now);
            let time = now.duration_since(self.started).as_secs_f64();
            driver.on_frame(self, id, time)?;
        }
        Ok(())
    }

    // Area-average the frame down to cols x (rows * 2) samples
    fn downsample(&mut self, frame: &Raster) {
        let (gw, gh) = (self.cols as usize, self.rows as usize * 2);
        let (fw, fh) = (frame.width(), frame.height());
        self.cells.clear();
        if gw == 0 || gh == 0 || fw == 0 || fh == 0 {
            return;
        }

        let span = |i: usize, from: usize, to: usize| {
            let start = (i * from / to).min(from - 1);
            let end = ((i + 1) * from / to).clamp(start + 1, from);
            start..end
        };
        let data = frame.data();
        for gy in 0..gh {
            let ys = span(gy, fh, gh);
            for gx in 0..gw {
                let xs = span(gx, fw, gw);
                let mut sum = (0u32, 0u32, 0u32);
                for y in ys.clone() {
                    for px in data[(y * fw + xs.start) * 4..(y * fw + xs.end) * 4].chunks_exact(4) {
                        sum.0 += px[0] as u32;
                        sum.1 += px[1] as u32;
                        sum.2 += px[2] as u32;
                    }
                }
                let n = (ys.len() * xs.len()) as u32;
                self.cells.push((average(sum.0, n), average(sum.1, n), average(sum.2, n)));
            }
        }
    }
}

fn average(sum: u32, n: u32) -> u8 {
    ((sum + n / 2) / n).min(255) as u8
}

fn is_quit(key: &KeyEvent) -> bool {
    key.kind == KeyEventKind::Press
        && (key.code == KeyCode::Char('q')
            || key.code == KeyCode::Esc
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)))
}

impl FrameHost for TerminalHost {
    type Error = std::io::Error;

    fn can_render(&self) -> bool {
        stdout().is_terminal() && self.cols > 0 && self.rows > 0
    }

    fn metrics(&self) -> WindowMetrics {
        WindowMetrics {
            width: self.cols as f64 * self.cell.0,
            height: self.rows as f64 * self.cell.1,
            device_pixel_ratio: self.settings.device_pixel_ratio,
            pixel_density: 1.0 / self.cell.0,
        }
    }

    fn request_frame(&mut self) -> FrameId {
        self.next_id += 1;
        let id = FrameId(self.next_id);
        let now = Instant::now();
        let deadline = self
            .last_frame
            .map(|last| last + self.frame_interval)
            .filter(|due| *due > now)
            .unwrap_or(now);
        self.pending = Some((id, deadline));
        id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        if self.pending.is_some_and(|(pending, _)| pending == id) {
            self.pending = None;
        }
    }

    fn add_resize_listener(&mut self) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push(id);
        id
    }

    fn remove_resize_listener(&mut self, id: ListenerId) {
        self.listeners.retain(|l| *l != id);
    }

    fn present(&mut self, frame: &Raster) -> std::io::Result<()> {
        self.downsample(frame);
        let (width, rows) = (self.cols as usize, self.rows as usize);
        if self.cells.len() != width * rows * 2 {
            return Ok(());
        }

        self.output_buf.clear();
        self.output_buf.extend_from_slice(b"\x1b[H");

        let mut prev_top_color: Option<(u8, u8, u8)> = None;
        let mut prev_bot_color: Option<(u8, u8, u8)> = None;

        for row in 0..rows {
            for x in 0..width {
                let top_color = self.cells[(row * 2) * width + x];
                let bot_color = self.cells[(row * 2 + 1) * width + x];

                if prev_top_color != Some(top_color) {
                    write!(
                        self.output_buf,
                        "\x1b[48;2;{};{};{}m",
                        top_color.0, top_color.1, top_color.2
                    )?;
                    prev_top_color = Some(top_color);
                }
                if prev_bot_color != Some(bot_color) {
                    write!(
                        self.output_buf,
                        "\x1b[38;2;{};{};{}m",
                        bot_color.0, bot_color.1, bot_color.2
                    )?;
                    prev_bot_color = Some(bot_color);
                }

                self.output_buf.extend_from_slice("▄".as_bytes());
            }
            self.output_buf.extend_from_slice(b"\x1b[0m");
            prev_top_color = None;
            prev_bot_color = None;
            if row + 1 < rows {
                self.output_buf.extend_from_slice(b"\r\n");
            }
        }

        self.stdout.write_all(&self.output_buf)?;
        self.stdout.flush()
    }
}

impl Drop for TerminalHost {
    fn drop(&mut self) {
        if self.entered {
            if let Err(e) = self.leave() {
                warn!(error = %e, "failed to restore terminal");
            } else {
                debug!("terminal restored on drop");
            }
        }
    }
}
