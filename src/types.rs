//! Core value types shared by the matcher, the API client and the engine

use serde::Deserialize;

/// Board palette color identifier
pub type ColorId = u32;

/// 8-bit RGB triple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Squared Euclidean distance in RGB space
    /// Ordering matches the true distance, so nearest-color search can skip the sqrt
    pub fn distance_squared(self, other: Rgb) -> u32 {
        let dr = i32::from(self.red) - i32::from(other.red);
        let dg = i32::from(self.green) - i32::from(other.green);
        let db = i32::from(self.blue) - i32::from(other.blue);
        (dr * dr + dg * dg + db * db) as u32
    }
}

/// One entry of the board palette as served by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PaletteEntry {
    pub id: ColorId,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl PaletteEntry {
    pub fn rgb(&self) -> Rgb {
        Rgb::new(self.red, self.green, self.blue)
    }
}

/// Dense 2-D grid indexed by (x, y)
///
/// Used for decoded source pixels, the target image and board snapshots alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    /// Column-major: index = x * height + y
    cells: Vec<T>,
}

pub type ColorGrid = Grid<ColorId>;

impl<T: Copy> Grid<T> {
    /// Build from columns, `columns[x][y]`; every column must have the same length
    pub fn from_columns(columns: Vec<Vec<T>>) -> Option<Self> {
        let width = columns.len();
        let height = columns.first().map_or(0, Vec::len);
        if columns.iter().any(|column| column.len() != height) {
            return None;
        }
        let cells = columns.into_iter().flatten().collect();
        Some(Self { width, height, cells })
    }

    /// Build by evaluating `f(x, y)` for every cell
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut cells = Vec::with_capacity(width * height);
        for x in 0..width {
            for y in 0..height {
                cells.push(f(x, y));
            }
        }
        Self { width, height, cells }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<T> {
        if x < self.width && y < self.height {
            Some(self.cells[x * self.height + y])
        } else {
            None
        }
    }

    /// Look up a cell by signed coordinates; anything outside the grid is `None`
    pub fn get_signed(&self, x: i64, y: i64) -> Option<T> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        self.get(x, y)
    }

    /// Iterate `(x, y, value)` in column-major order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        let height = self.height.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, value)| (i / height, i % height, *value))
    }
}
