use firmbridge::hardware::{Board, Comparison};
use firmbridge::io::{Serial, SerialConfig};
use firmbridge::pause;
use simplelog::*;

#[tokio::main]
async fn main() {
    TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .unwrap();

    let port = std::env::args().nth(1).unwrap_or_else(|| String::from("/dev/ttyACM0"));
    let board = Board::from(Serial::with_config(SerialConfig::new(port)));
    board.open().unwrap();

    // Prints every connection change until the board goes away.
    let mut link = board.subscribe();
    let watcher = board.clone();
    tokio::spawn(async move {
        while link.changed().await.is_ok() {
            let state = *link.borrow_and_update();
            println!("Link: {} - status: {}", state, watcher.status());
        }
    });

    loop {
        pause!(1000);
        if !board.is_connected() {
            continue;
        }
        match board.read_analog_pin("A0") {
            Ok(value) => {
                let high = board.compare_analog(0, Comparison::Above, 50.0).unwrap_or(false);
                println!("A0: {}% (above half: {})", value, high);
            }
            Err(error) => println!("A0 unavailable: {}", error),
        }
        match board.is_digital_on(2) {
            Ok(on) => println!("D2: {}", if on { "on" } else { "off" }),
            Err(error) => println!("D2 unavailable: {}", error),
        }
    }
}
