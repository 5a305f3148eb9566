pub const SHIM: &str = r"
     _       _       _     _
  __| | ___ | |__   | |__ (_)_ __ ___
 / _` |/ _ \| '_ \  | '_ \| | '_ ` _ \
| (_| | (_) | | | |_| | | | | | | | | |
 \__,_|\___/|_| |_(_)_| |_|_|_| |_| |_|
";
