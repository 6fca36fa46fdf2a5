use std::collections::HashMap;

pub struct CliOptions {
    pub use_multi_thread: bool,
    pub scene_name: Option<String>,
    /// Rays per side of the firing grid.
    pub grid: usize,
    pub onehit: i32,
    pub seed: Option<u64>,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            use_multi_thread: true,
            scene_name: None,
            grid: 256,
            onehit: 0,
            seed: None,
        }
    }
}

impl CliOptions {
    pub fn message() -> &'static str {
        r#"
        --use_multi_thread | --use_single_thread
        --scene_name <scene_name>
        --grid <rays per side>
        --onehit <n>
        --seed <u64>
        "#
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, v: Option<String>) -> Result<T, String> {
    let v = v.ok_or_else(|| format!("Missing value for {}", key))?;
    v.parse::<T>()
        .map_err(|_| format!("Bad value {} for {}", v, key))
}

pub fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut pairs: HashMap<String, Option<String>> = HashMap::new();
    let mut args = args.into_iter().rev().collect::<Vec<_>>();
    args.pop(); // Removes args[0]

    while let Some(key) = args.pop() {
        if !key.starts_with("--") {
            return Err(format!("Unrecognized key {}", key));
        }
        match args.last() {
            None => {
                pairs.insert(key, None);
            }
            Some(value) => {
                // Lets negative numbers through as values.
                if value.starts_with("--") {
                    pairs.insert(key, None);
                } else {
                    let value = args.pop();
                    pairs.insert(key, value);
                }
            }
        }
    }
    let mut options = CliOptions::default();
    for (k, v) in pairs.into_iter() {
        match k.as_str() {
            "--use_multi_thread" => options.use_multi_thread = true,
            "--use_single_thread" => options.use_multi_thread = false,
            "--scene_name" => options.scene_name = v,
            "--grid" => options.grid = parse_value(&k, v)?,
            "--onehit" => options.onehit = parse_value(&k, v)?,
            "--seed" => options.seed = Some(parse_value(&k, v)?),
            "--help" => {
                println!("usage: {}", CliOptions::message());
            }
            _ => return Err(format!("Unrecognized key {}", k)),
        }
    }
    if options.grid == 0 {
        return Err("--grid must be positive".to_string());
    }
    Ok(options)
}
