//! Gibt einen frisch erzeugten Raum-Code aus

fn main() {
    println!("{}", oase_core::RoomCode::generieren());
}
