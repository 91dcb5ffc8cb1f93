//! QWERTY neighbour table used to pick plausible typos.

/// Keys physically adjacent to `c` on a US QWERTY keyboard.
///
/// Only lowercase letters and digits have entries.
pub fn neighbors(c: char) -> Option<&'static str> {
    let keys = match c {
        'a' => "qwsz",
        'b' => "vghn",
        'c' => "xdfv",
        'd' => "serfcx",
        'e' => "wsdfr",
        'f' => "drtgvc",
        'g' => "ftyhbv",
        'h' => "gyujnb",
        'i' => "ujklo",
        'j' => "huiknm",
        'k' => "jiolm",
        'l' => "kopm",
        'm' => "njk,",
        'n' => "bhjm",
        'o' => "iklp",
        'p' => "ol",
        'q' => "wa",
        'r' => "edfgt",
        's' => "awedxz",
        't' => "rfgyh",
        'u' => "yhjki",
        'v' => "cfgb",
        'w' => "qasde",
        'x' => "zsdc",
        'y' => "tghju",
        'z' => "asx",
        '1' => "2q",
        '2' => "1qwa3",
        '3' => "2we4",
        '4' => "3er5",
        '5' => "4rt6",
        '6' => "5ty7",
        '7' => "6yu8",
        '8' => "7ui9",
        '9' => "8io0",
        '0' => "9op-",
        _ => return None,
    };
    Some(keys)
}
