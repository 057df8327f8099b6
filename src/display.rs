use embedded_graphics::{
    mono_font::{MonoTextStyle, ascii::FONT_10X20},
    pixelcolor::{Rgb565, Rgb888},
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Baseline, Text, TextStyleBuilder},
};

use crate::model::{Line, READING_LINES, Reading, RiskLevel};
use crate::palette::{self, Appearance};
use crate::traits::Surface;

/// Painted area of the 240x240 panel. The bottom 40 rows are left alone.
pub const CONTENT_WIDTH: u32 = 240;
pub const CONTENT_HEIGHT: u32 = 200;

const TEXT_X: i32 = 5;
const STATUS_Y: i32 = 100;
const FIRST_LINE_Y: i32 = 40;
const LINE_SPACING: i32 = 40;

/// Full-frame text renderer on any RGB565 draw target
pub struct Screen<D> {
    target: D,
}

impl<D> Screen<D>
where
    D: DrawTarget<Color = Rgb565>,
{
    pub fn new(target: D) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &D {
        &self.target
    }

    fn clear(&mut self, appearance: &Appearance) -> Result<(), &'static str> {
        Rectangle::new(Point::zero(), Size::new(CONTENT_WIDTH, CONTENT_HEIGHT))
            .into_styled(PrimitiveStyle::with_fill(Rgb565::from(appearance.background)))
            .draw(&mut self.target)
            .map_err(|_| "Failed to fill background")
    }

    fn draw_line(&mut self, text: &str, y: i32, color: Rgb888) -> Result<(), &'static str> {
        // Vertically centered on `y`, like an anchored label
        let baseline_style = TextStyleBuilder::new().baseline(Baseline::Middle).build();
        Text::with_text_style(
            text,
            Point::new(TEXT_X, y),
            MonoTextStyle::new(&FONT_10X20, Rgb565::from(color)),
            baseline_style,
        )
        .draw(&mut self.target)
        .map_err(|_| "Failed to draw text")?;
        Ok(())
    }
}

impl<D> Surface for Screen<D>
where
    D: DrawTarget<Color = Rgb565>,
{
    fn render_status(&mut self, level: RiskLevel, message: &str) -> Result<(), &'static str> {
        let appearance = palette::appearance_for(level);
        self.clear(appearance)?;
        self.draw_line(message, STATUS_Y, appearance.text)
    }

    fn render_readings(&mut self, level: RiskLevel, lines: &[&str; 4]) -> Result<(), &'static str> {
        let appearance = palette::appearance_for(level);
        self.clear(appearance)?;
        for (j, line) in lines.iter().enumerate() {
            self.draw_line(line, FIRST_LINE_Y + LINE_SPACING * j as i32, appearance.text)?;
        }
        Ok(())
    }
}

/// What is currently on screen, if it is a reading.
#[derive(Debug, Default, Clone)]
pub struct DeviceView {
    shown: Option<([Line; READING_LINES], RiskLevel)>,
}

impl DeviceView {
    pub const fn new() -> Self {
        Self { shown: None }
    }

    /// Compares the four lines by value; the level is not part of the check.
    pub fn needs_redraw(&self, reading: &Reading) -> bool {
        match &self.shown {
            Some((lines, _)) => lines != reading.raw_lines(),
            None => true,
        }
    }

    pub fn remember(&mut self, reading: &Reading) {
        self.shown = Some((reading.raw_lines().clone(), reading.level()));
    }

    pub fn forget(&mut self) {
        self.shown = None;
    }

    pub fn level(&self) -> Option<RiskLevel> {
        self.shown.as_ref().map(|(_, level)| *level)
    }
}

/// Surface plus the redraw policy: readings are repainted only when the
/// selected lines differ from what is on screen, since painting is slow.
pub struct Renderer<S> {
    surface: S,
    view: DeviceView,
}

impl<S: Surface> Renderer<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            view: DeviceView::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn view(&self) -> &DeviceView {
        &self.view
    }

    pub fn status(&mut self, level: RiskLevel, message: &str) -> Result<(), &'static str> {
        log::info!("[LCD] 1-line drawing, level:{}, text:{}", level.value(), message);
        self.view.forget();
        self.surface.render_status(level, message)
    }

    /// Returns whether the screen was repainted.
    pub fn show(&mut self, reading: &Reading) -> Result<bool, &'static str> {
        if !self.view.needs_redraw(reading) {
            return Ok(false);
        }
        log::info!("[LCD] 4-line drawing, level:{}", reading.level().value());
        for line in reading.lines() {
            log::info!("[LCD]   {}", line);
        }
        self.surface.render_readings(reading.level(), &reading.lines())?;
        self.view.remember(reading);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::parse_dataset;
    use crate::model::View;
    use core::convert::Infallible;
    use std::vec;
    use std::vec::Vec;

    const WIDTH: usize = 240;
    const HEIGHT: usize = 240;

    struct Panel {
        pixels: Vec<Option<Rgb565>>,
    }

    impl Panel {
        fn new() -> Self {
            Self {
                pixels: vec![None; WIDTH * HEIGHT],
            }
        }

        fn at(&self, x: usize, y: usize) -> Option<Rgb565> {
            self.pixels[y * WIDTH + x]
        }

        fn count_in_rows(&self, rows: core::ops::Range<usize>, color: Rgb565) -> usize {
            rows.flat_map(|y| (0..WIDTH).map(move |x| (x, y)))
                .filter(|&(x, y)| self.at(x, y) == Some(color))
                .count()
        }
    }

    impl OriginDimensions for Panel {
        fn size(&self) -> Size {
            Size::new(WIDTH as u32, HEIGHT as u32)
        }
    }

    impl DrawTarget for Panel {
        type Color = Rgb565;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            for Pixel(point, color) in pixels {
                if (0..WIDTH as i32).contains(&point.x) && (0..HEIGHT as i32).contains(&point.y) {
                    self.pixels[point.y as usize * WIDTH + point.x as usize] = Some(color);
                }
            }
            Ok(())
        }
    }

    fn level(value: u8) -> RiskLevel {
        RiskLevel::new(value).unwrap()
    }

    #[test]
    fn status_fills_content_area_only() {
        let mut screen = Screen::new(Panel::new());
        screen.render_status(level(4), "SERVER err").unwrap();

        let orange = Rgb565::from(Rgb888::new(0xFF, 0x96, 0x02));
        let panel = screen.target();
        assert_eq!(panel.at(0, 0), Some(orange));
        assert_eq!(panel.at(239, 199), Some(orange));
        assert_eq!(panel.at(0, 200), None);
        assert_eq!(panel.at(120, 230), None);
    }

    #[test]
    fn status_text_is_near_the_middle() {
        let mut screen = Screen::new(Panel::new());
        screen.render_status(level(0), " INITIALIZE").unwrap();

        let black = Rgb565::from(Rgb888::new(0, 0, 0));
        let panel = screen.target();
        assert!(panel.count_in_rows(88..112, black) > 0);
        assert_eq!(panel.count_in_rows(0..80, black), 0);
        assert_eq!(panel.count_in_rows(120..200, black), 0);
    }

    #[test]
    fn readings_draw_four_bands_in_level_text_color() {
        let mut screen = Screen::new(Panel::new());
        screen
            .render_readings(level(5), &["ROOM 12:00", "33.0C 70%", "WBGT 31.2", "level: 5"])
            .unwrap();

        let white = Rgb565::from(Rgb888::new(0xFF, 0xFF, 0xFF));
        let panel = screen.target();
        for j in 0..4 {
            let y = (40 + 40 * j) as usize;
            assert!(panel.count_in_rows(y - 10..y + 10, white) > 0, "line {}", j);
        }
    }

    #[derive(Default)]
    struct Counting {
        readings: usize,
        statuses: usize,
    }

    impl Surface for Counting {
        fn render_status(&mut self, _: RiskLevel, _: &str) -> Result<(), &'static str> {
            self.statuses += 1;
            Ok(())
        }

        fn render_readings(&mut self, _: RiskLevel, _: &[&str; 4]) -> Result<(), &'static str> {
            self.readings += 1;
            Ok(())
        }
    }

    const BODY: &str = "ROOM 07:15\n28.1C 65%\nWBGT 25.3\nlevel: 3\nLIB. 07:10\n31.0C 70%\nWBGT 28.9\nlevel: 4\n";

    #[test]
    fn identical_lines_are_not_repainted() {
        let dataset = parse_dataset(BODY).unwrap();
        let again = parse_dataset(BODY).unwrap();
        let mut renderer = Renderer::new(Counting::default());

        assert_eq!(renderer.show(dataset.indoor()), Ok(true));
        assert_eq!(renderer.show(again.indoor()), Ok(false));
        assert_eq!(renderer.surface().readings, 1);
        assert_eq!(renderer.view().level(), Some(level(3)));
    }

    #[test]
    fn any_changed_line_repaints() {
        let dataset = parse_dataset(BODY).unwrap();
        let changed = parse_dataset(&BODY.replace("28.1C 65%", "28.2C 65%")).unwrap();
        let mut renderer = Renderer::new(Counting::default());

        renderer.show(dataset.reading(View::Indoor)).unwrap();
        assert_eq!(renderer.show(changed.reading(View::Indoor)), Ok(true));
        assert_eq!(renderer.show(changed.reading(View::Outdoor)), Ok(true));
        assert_eq!(renderer.surface().readings, 3);
    }

    #[test]
    fn status_invalidates_view() {
        let dataset = parse_dataset(BODY).unwrap();
        let mut renderer = Renderer::new(Counting::default());

        renderer.show(dataset.indoor()).unwrap();
        renderer.status(level(4), "VALUE err").unwrap();
        assert_eq!(renderer.view().level(), None);
        assert_eq!(renderer.show(dataset.indoor()), Ok(true));
        assert_eq!(renderer.surface().statuses, 1);
    }

    struct Broken;

    impl Surface for Broken {
        fn render_status(&mut self, _: RiskLevel, _: &str) -> Result<(), &'static str> {
            Err("bus error")
        }

        fn render_readings(&mut self, _: RiskLevel, _: &[&str; 4]) -> Result<(), &'static str> {
            Err("bus error")
        }
    }

    #[test]
    fn failed_paint_is_retried_next_time() {
        let dataset = parse_dataset(BODY).unwrap();
        let mut renderer = Renderer::new(Broken);
        assert_eq!(renderer.show(dataset.indoor()), Err("bus error"));
        assert!(renderer.view().needs_redraw(dataset.indoor()));
    }
}
