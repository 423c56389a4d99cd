use image::imageops::FilterType;
use ratatui::prelude::{Color, Line, Span, Style};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Cover image downscaled to terminal cells, two pixels per cell (upper half block).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArt {
    cols: u16,
    rows: u16,
    cells: Vec<([u8; 3], [u8; 3])>,
}

impl CoverArt {
    pub fn render(path: &Path, cols: u16, rows: u16) -> Result<Self, image::ImageError> {
        let pixels = image::open(path)?
            .resize_exact(u32::from(cols), u32::from(rows) * 2, FilterType::Triangle)
            .to_rgb8();

        let mut cells = Vec::with_capacity(usize::from(cols) * usize::from(rows));
        for y in 0..u32::from(rows) {
            for x in 0..u32::from(cols) {
                let top = pixels.get_pixel(x, y * 2).0;
                let bottom = pixels.get_pixel(x, y * 2 + 1).0;
                cells.push((top, bottom));
            }
        }
        Ok(Self { cols, rows, cells })
    }

    pub fn size(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    pub fn cell(&self, col: u16, row: u16) -> Option<([u8; 3], [u8; 3])> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.cells
            .get(usize::from(row) * usize::from(self.cols) + usize::from(col))
            .copied()
    }

    pub fn lines(&self) -> Vec<Line<'static>> {
        self.cells
            .chunks(usize::from(self.cols.max(1)))
            .map(|row| {
                Line::from(
                    row.iter()
                        .map(|(top, bottom)| {
                            Span::styled(
                                "\u{2580}",
                                Style::default()
                                    .fg(Color::Rgb(top[0], top[1], top[2]))
                                    .bg(Color::Rgb(bottom[0], bottom[1], bottom[2])),
                            )
                        })
                        .collect::<Vec<_>>(),
                )
            })
            .collect()
    }
}

/// Keeps the last rendered cover so redraws do not decode the image again.
#[derive(Debug, Default)]
pub struct CoverCache {
    key: Option<(PathBuf, u16, u16)>,
    art: Option<CoverArt>,
}

impl CoverCache {
    pub fn get(&mut self, path: Option<&Path>, cols: u16, rows: u16) -> Option<&CoverArt> {
        let path = path?;
        if cols == 0 || rows == 0 {
            return None;
        }

        let fresh = self
            .key
            .as_ref()
            .is_some_and(|(cached, c, r)| cached == path && *c == cols && *r == rows);
        if !fresh {
            self.key = Some((path.to_path_buf(), cols, rows));
            self.art = match CoverArt::render(path, cols, rows) {
                Ok(art) => Some(art),
                Err(err) => {
                    debug!(path = %path.display(), "cover not decodable: {err}");
                    None
                }
            };
        }
        self.art.as_ref()
    }
}
