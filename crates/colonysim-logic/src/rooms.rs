//! Room detection by 4-connected flood fill over room-space tiles.
//!
//! A room is a maximal connected region of tiles for which
//! [`TileType::is_room_space`] holds. Walls, trees and doors bound rooms.
//! Perimeter counts tile edges, not tiles: every side of a room tile that
//! faces a non-room tile or the map edge adds one.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::grid::{Coord, DIRS4};
use crate::tiles::TileType;

/// Statistics for one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: usize,
    /// Tile count.
    pub area: usize,
    /// Edge count against non-room tiles or the map edge.
    pub perimeter: usize,
    /// Distinct door tiles adjacent to the room.
    pub door_count: usize,
    /// False when any room tile lies on the map border.
    pub indoors: bool,
    pub min: Coord,
    pub max: Coord,
}

/// Room labelling for a whole map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomIndex {
    width: i32,
    height: i32,
    /// Per-tile room id, `None` for non-room tiles.
    labels: Vec<Option<usize>>,
    rooms: Vec<RoomInfo>,
    indoors_tiles: usize,
}

impl RoomIndex {
    /// Label every room in a row-major `tiles` slice of `width * height`.
    pub fn build(width: i32, height: i32, tiles: &[TileType]) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        let n = (width * height) as usize;
        debug_assert_eq!(tiles.len(), n);

        let mut labels: Vec<Option<usize>> = vec![None; n];
        let mut rooms = Vec::new();
        let mut queue = VecDeque::new();
        let index = |x: i32, y: i32| (y * width + x) as usize;
        let in_bounds = |x: i32, y: i32| x >= 0 && y >= 0 && x < width && y < height;

        for start in 0..n.min(tiles.len()) {
            if labels[start].is_some() || !tiles[start].is_room_space() {
                continue;
            }

            let id = rooms.len();
            let sx = start as i32 % width;
            let sy = start as i32 / width;
            let mut info = RoomInfo {
                id,
                area: 0,
                perimeter: 0,
                door_count: 0,
                indoors: true,
                min: Coord::new(sx, sy),
                max: Coord::new(sx, sy),
            };
            let mut doors = BTreeSet::new();

            labels[start] = Some(id);
            queue.push_back((sx, sy));

            while let Some((x, y)) = queue.pop_front() {
                info.area += 1;
                info.min = Coord::new(info.min.x.min(x), info.min.y.min(y));
                info.max = Coord::new(info.max.x.max(x), info.max.y.max(y));

                for &(dx, dy) in &DIRS4 {
                    let nx = x + dx;
                    let ny = y + dy;
                    if !in_bounds(nx, ny) {
                        info.perimeter += 1;
                        info.indoors = false;
                        continue;
                    }
                    let ni = index(nx, ny);
                    let t = tiles[ni];
                    if !t.is_room_space() {
                        info.perimeter += 1;
                        if t == TileType::Door {
                            doors.insert(ni);
                        }
                        continue;
                    }
                    if labels[ni].is_none() {
                        labels[ni] = Some(id);
                        queue.push_back((nx, ny));
                    }
                }
            }

            info.door_count = doors.len();
            rooms.push(info);
        }

        let indoors_tiles = rooms.iter().filter(|r| r.indoors).map(|r| r.area).sum();

        Self {
            width,
            height,
            labels,
            rooms,
            indoors_tiles,
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn rooms(&self) -> &[RoomInfo] {
        &self.rooms
    }

    pub fn room_id_at(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        self.labels[(y * self.width + x) as usize]
    }

    pub fn room_info(&self, id: usize) -> Option<&RoomInfo> {
        self.rooms.get(id)
    }

    pub fn indoors_room_count(&self) -> usize {
        self.rooms.iter().filter(|r| r.indoors).count()
    }

    pub fn indoors_tile_count(&self) -> usize {
        self.indoors_tiles
    }

    pub fn tile_indoors(&self, x: i32, y: i32) -> bool {
        self.room_id_at(x, y)
            .and_then(|id| self.rooms.get(id))
            .is_some_and(|r| r.indoors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(rows: &[&str]) -> (i32, i32, Vec<TileType>) {
        let h = rows.len() as i32;
        let w = rows[0].len() as i32;
        let tiles = rows
            .iter()
            .flat_map(|r| r.chars())
            .map(|ch| match ch {
                '#' => TileType::Wall,
                'D' => TileType::Door,
                'T' => TileType::Tree,
                'F' => TileType::Farm,
                _ => TileType::Empty,
            })
            .collect();
        (w, h, tiles)
    }

    #[test]
    fn test_open_map_is_one_outdoor_room() {
        let (w, h, tiles) = map(&["....", "....", "...."]);
        let idx = RoomIndex::build(w, h, &tiles);
        assert_eq!(idx.room_count(), 1);
        let r = &idx.rooms()[0];
        assert_eq!(r.area, 12);
        assert_eq!(r.perimeter, 14);
        assert!(!r.indoors);
        assert_eq!(idx.indoors_room_count(), 0);
    }

    #[test]
    fn test_walled_room_with_one_door() {
        let (w, h, tiles) = map(&[
            "........",
            ".######.",
            ".#....#.",
            ".#....D.",
            ".#....#.",
            ".#....#.",
            ".######.",
            "........",
        ]);
        let idx = RoomIndex::build(w, h, &tiles);
        let id = idx.room_id_at(3, 3).unwrap();
        let r = idx.room_info(id).unwrap();
        assert_eq!(r.area, 16);
        assert_eq!(r.perimeter, 16);
        assert_eq!(r.door_count, 1);
        assert!(r.indoors);
        assert_eq!(r.min, Coord::new(2, 2));
        assert_eq!(r.max, Coord::new(5, 5));
        assert!(idx.tile_indoors(2, 5));
        assert!(!idx.tile_indoors(0, 0));
        assert_eq!(idx.indoors_tile_count(), 16);
        // Outer ring touches the door too.
        let outside = idx.room_info(idx.room_id_at(0, 0).unwrap()).unwrap();
        assert_eq!(outside.door_count, 1);
        assert!(!outside.indoors);
    }

    #[test]
    fn test_trees_split_regions() {
        let (w, h, tiles) = map(&[".T.", ".T.", ".T."]);
        let idx = RoomIndex::build(w, h, &tiles);
        assert_eq!(idx.room_count(), 2);
        assert_eq!(idx.room_id_at(1, 1), None);
        assert_ne!(idx.room_id_at(0, 0), idx.room_id_at(2, 0));
    }

    #[test]
    fn test_farms_are_room_space() {
        let (w, h, tiles) = map(&["#####", "#FF.#", "#####"]);
        let idx = RoomIndex::build(w, h, &tiles);
        assert_eq!(idx.room_count(), 1);
        assert_eq!(idx.rooms()[0].area, 3);
        assert!(idx.rooms()[0].indoors);
    }

    #[test]
    fn test_out_of_bounds_query() {
        let (w, h, tiles) = map(&["..", ".."]);
        let idx = RoomIndex::build(w, h, &tiles);
        assert_eq!(idx.room_id_at(-1, 0), None);
        assert_eq!(idx.room_id_at(0, 2), None);
        assert!(idx.room_info(7).is_none());
    }
}
