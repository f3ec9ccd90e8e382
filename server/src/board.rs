use parques_shared::{CellKind, Color, BOARD_SIZE};

/// Cells where pieces cannot be captured.
pub const SAFE_CELLS: [u8; 16] = [5, 12, 17, 22, 29, 34, 39, 46, 51, 56, 63, 68, 73, 80, 85, 90];

/// Static layout of the 96-cell track.
///
/// Cells only know their kind. Who stands on a cell is always derived from
/// piece positions.
#[derive(Debug, Clone)]
pub struct Board {
    cells: [CellKind; BOARD_SIZE],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        let mut cells = [CellKind::Normal; BOARD_SIZE];
        for cell in SAFE_CELLS {
            cells[cell as usize] = CellKind::Safe;
        }
        for color in Color::ALL {
            cells[color.exit_cell() as usize] = CellKind::Exit;
        }
        Self { cells }
    }

    pub fn kind(&self, index: u8) -> CellKind {
        self.cells[index as usize % BOARD_SIZE]
    }

    pub fn cells(&self) -> &[CellKind] {
        &self.cells
    }
}
