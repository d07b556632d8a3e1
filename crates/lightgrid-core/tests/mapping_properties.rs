//! Integration tests for the public mapping API.
//!
//! These exercise the mapper, board layout and persisted document together
//! through the crate root re-exports, the way the board crate uses them.

use std::collections::HashSet;

use lightgrid_core::{
    BoardLayout, BoardLayoutDocument, Color, DeviceId, LayoutError, LayoutKind, LayoutMapper,
    Position, RawCoordinate, SourceLayout, TargetLayout, TargetRectangle,
};

fn source(device: &str, coords: &[(i32, i32, i32)]) -> SourceLayout {
    SourceLayout::new(
        DeviceId::new(device),
        "uuid",
        LayoutKind::TwoD,
        coords.iter().map(|&(x, y, z)| RawCoordinate::new(x, y, z)),
    )
}

/// A scrambled 4×3 panel plus a 2×3 panel, 18 LEDs in total.
fn two_panels() -> Vec<SourceLayout> {
    vec![
        source(
            "left",
            &[
                (3, 2, 0), (0, 0, 0), (2, 1, 0), (1, 2, 0), (0, 2, 0), (3, 0, 0),
                (1, 0, 0), (2, 2, 0), (0, 1, 0), (3, 1, 0), (1, 1, 0), (2, 0, 0),
            ],
        ),
        source("right", &[(4, 0, 0), (4, 1, 0), (4, 2, 0), (5, 2, 0), (5, 1, 0), (5, 0, 0)]),
    ]
}

#[test]
fn test_exact_fit_maps_each_coordinate_to_its_own_cell() {
    // Arrange
    let target = TargetLayout::grid(6, 3).unwrap();

    // Act
    let layout = LayoutMapper::map_layouts(two_panels(), &target).unwrap();

    // Assert: every cell taken once, and the physical coordinates line up
    let positions: HashSet<Position> = layout.leds().iter().filter_map(|l| l.position).collect();
    assert_eq!(positions.len(), 18);
    assert_eq!(
        layout.get_by_device_index(&DeviceId::new("left"), 0).unwrap().position,
        Some(Position::new(3, 2))
    );
    assert_eq!(
        layout.get_by_device_index(&DeviceId::new("right"), 3).unwrap().position,
        Some(Position::new(5, 2))
    );
}

#[test]
fn test_every_mapped_cell_belongs_to_the_target() {
    let target = TargetLayout::new(vec![
        TargetRectangle { x: 10, y: -1, width: 3, height: 2 },
        TargetRectangle { x: 0, y: 0, width: 2, height: 4 },
    ])
    .unwrap();
    let cells: HashSet<Position> = target
        .columns()
        .iter()
        .flat_map(|c| c.rows.iter().map(move |&y| Position::new(c.x, y)))
        .collect();

    let layout = LayoutMapper::map_layouts(two_panels(), &target).unwrap();

    assert_eq!(layout.all_active().len(), 14);
    for led in layout.all_active() {
        assert!(cells.contains(&led.position.unwrap()));
    }
}

#[test]
fn test_colors_survive_a_document_round_trip_as_positions() {
    // Arrange
    let target = TargetLayout::grid(6, 3).unwrap();
    let mapped = LayoutMapper::map_layouts(two_panels(), &target).unwrap();
    let document: BoardLayoutDocument = mapped.to_document();
    let json = serde_json::to_string(&document).unwrap();

    // Act
    let parsed: BoardLayoutDocument = serde_json::from_str(&json).unwrap();
    let mut restored = BoardLayout::from_document(&parsed, |_| true).unwrap();
    let device = restored.set_color(Position::new(4, 1), Color::GREEN).unwrap().clone();

    // Assert
    assert_eq!(device, DeviceId::new("right"));
    let frame = restored.frame(&device).unwrap();
    assert_eq!(frame.colors()[1], Color::GREEN);
    assert_eq!(restored.to_document(), mapped.to_document());
}

#[test]
fn test_loading_a_document_for_an_unknown_device_fails() {
    let target = TargetLayout::grid(6, 3).unwrap();
    let document = LayoutMapper::map_layouts(two_panels(), &target)
        .unwrap()
        .to_document();

    let result = BoardLayout::from_document(&document, |id| id.as_str() == "left");

    assert_eq!(result.unwrap_err(), LayoutError::UnknownDevice(DeviceId::new("right")));
}
