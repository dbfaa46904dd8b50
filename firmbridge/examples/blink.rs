use firmbridge::hardware::Board;
use firmbridge::io::Serial;
use firmbridge::pause;
use simplelog::*;

#[tokio::main]
async fn main() {
    TermLogger::init(
        LevelFilter::Debug,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .unwrap();

    // Serial port given as first argument, first available port otherwise.
    let board = match std::env::args().nth(1) {
        Some(port) => Board::from(Serial::new(port)),
        None => Board::default(),
    };
    board.register_alias("led", 13).unwrap();
    board.open().unwrap();

    let mut link = board.subscribe();
    while !link.borrow_and_update().is_connected() {
        link.changed().await.unwrap();
    }

    // Blinks the embedded LED every 500ms (for 10sec).
    let mut level = true;
    for _ in 0..20 {
        board.set_digital_output("led", level).unwrap();
        level = !level;
        pause!(500);
    }

    board.close().unwrap();
}
