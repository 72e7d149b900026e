use colonysim_logic::rooms::RoomIndex;
use colonysim_logic::tiles::TileType;

#[test]
fn test_two_rooms_share_a_door() {
    // #########
    // #...D...#
    // #########
    let w = 9;
    let h = 3;
    let mut tiles = vec![TileType::Wall; (w * h) as usize];
    for x in 1..8 {
        tiles[(w + x) as usize] = TileType::Floor;
    }
    tiles[(w + 4) as usize] = TileType::Door;

    let idx = RoomIndex::build(w, h, &tiles);
    assert_eq!(idx.room_count(), 2);
    for room in idx.rooms() {
        assert_eq!(room.area, 3);
        assert_eq!(room.perimeter, 8);
        assert_eq!(room.door_count, 1);
        assert!(room.indoors);
    }
    assert_eq!(idx.indoors_room_count(), 2);
    assert_eq!(idx.indoors_tile_count(), 6);
}
