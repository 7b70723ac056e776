use ratatui::layout::{Constraint, Direction, Layout, Rect};

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = split_vertical(
        r,
        &[
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ],
    );
    let horizontal = split_horizontal(
        vertical[1],
        &[
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ],
    );
    horizontal[1]
}

pub fn split_vertical(area: Rect, constraints: &[Constraint]) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints.iter().copied().collect::<Vec<_>>())
        .split(area)
        .to_vec()
}

pub fn split_horizontal(area: Rect, constraints: &[Constraint]) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints.iter().copied().collect::<Vec<_>>())
        .split(area)
        .to_vec()
}

/// Equal-sized cells, `rows` high and `columns` wide, row-major.
pub fn grid(area: Rect, rows: usize, columns: usize) -> Vec<Vec<Rect>> {
    if rows == 0 || columns == 0 {
        return Vec::new();
    }
    let row_constraints = vec![Constraint::Ratio(1, rows as u32); rows];
    let column_constraints = vec![Constraint::Ratio(1, columns as u32); columns];
    split_vertical(area, &row_constraints)
        .into_iter()
        .map(|row| split_horizontal(row, &column_constraints))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_splits_into_equal_cells() {
        let cells = grid(Rect::new(0, 0, 80, 20), 2, 4);
        assert_eq!(cells.len(), 2);
        assert!(cells.iter().all(|row| row.len() == 4));
        assert_eq!(cells[0][0], Rect::new(0, 0, 20, 10));
        assert_eq!(cells[1][3], Rect::new(60, 10, 20, 10));
        assert!(grid(Rect::new(0, 0, 10, 10), 0, 3).is_empty());
    }

    #[test]
    fn centered_rect_stays_inside() {
        let outer = Rect::new(0, 0, 100, 50);
        let inner = centered_rect(60, 20, outer);
        assert_eq!(inner.width, 60);
        assert_eq!(inner.height, 10);
        assert!(inner.x >= outer.x && inner.right() <= outer.right());
    }
}
