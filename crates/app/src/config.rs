//! Command-line configuration.
//!
//! Flags: `--mesh=PATH` (or a bare positional path),
//! `--gpu-backend=auto|vulkan|dx12|metal|gl`, `--size=WxH`, `--width=W`,
//! `--height=H`, `--show-fps[=on|off]`, `--sensitivity=F`.

use std::path::PathBuf;

pub const DEFAULT_MESH: &str = "assets/cube.obj";
const DEFAULT_SIZE: (u32, u32) = (1280, 720);
const DEFAULT_SENSITIVITY: f32 = 0.01;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub mesh: PathBuf,
    pub backends: wgpu::Backends,
    pub show_fps: bool,
    pub width: u32,
    pub height: u32,
    pub sensitivity: f32,
}

impl AppConfig {
    /// Parse arguments, excluding the program name.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        let (width, height) = parse_size_args(&args);
        Self {
            mesh: parse_mesh_arg(&args),
            backends: parse_backend_arg(&args),
            show_fps: parse_show_fps_arg(&args),
            width,
            height,
            sensitivity: parse_sensitivity_arg(&args),
        }
    }
}

fn parse_mesh_arg(args: &[String]) -> PathBuf {
    let mut mesh = None;
    for arg in args {
        if let Some(val) = arg.strip_prefix("--mesh=") {
            mesh = Some(val);
        } else if !arg.starts_with("--") && mesh.is_none() {
            mesh = Some(arg.as_str());
        }
    }
    PathBuf::from(mesh.unwrap_or(DEFAULT_MESH))
}

fn parse_backend_arg(args: &[String]) -> wgpu::Backends {
    let mut backends = wgpu::Backends::all(); // default = auto
    for arg in args {
        if let Some(val) = arg.strip_prefix("--gpu-backend=") {
            backends = match val.to_ascii_lowercase().as_str() {
                "auto" => wgpu::Backends::all(),
                "vulkan" | "vk" => wgpu::Backends::VULKAN,
                "dx12" | "d3d12" => wgpu::Backends::DX12,
                "metal" | "mtl" => wgpu::Backends::METAL,
                "gl" | "opengl" | "gles" => wgpu::Backends::GL,
                other => {
                    log::warn!("Unknown backend '{}', falling back to auto.", other);
                    wgpu::Backends::all()
                }
            };
        }
    }
    backends
}

fn parse_show_fps_arg(args: &[String]) -> bool {
    // --show-fps[=on|off], off by default
    for arg in args {
        if arg == "--show-fps" {
            return true;
        }
        if let Some(val) = arg.strip_prefix("--show-fps=") {
            return matches!(
                val.to_ascii_lowercase().as_str(),
                "1" | "true" | "on" | "yes"
            );
        }
    }
    false
}

fn parse_size_args(args: &[String]) -> (u32, u32) {
    let mut w: Option<u32> = None;
    let mut h: Option<u32> = None;

    for arg in args {
        if let Some(v) = arg.strip_prefix("--size=") {
            if let Some((sw, sh)) = v.split_once('x').or_else(|| v.split_once('X')) {
                if let (Ok(pw), Ok(ph)) = (sw.parse::<u32>(), sh.parse::<u32>()) {
                    w = Some(pw);
                    h = Some(ph);
                }
            }
        } else if let Some(v) = arg.strip_prefix("--width=") {
            if let Ok(pw) = v.parse::<u32>() {
                w = Some(pw);
            }
        } else if let Some(v) = arg.strip_prefix("--height=") {
            if let Ok(ph) = v.parse::<u32>() {
                h = Some(ph);
            }
        }
    }

    let ww = w.unwrap_or(DEFAULT_SIZE.0).max(1);
    let hh = h.unwrap_or(DEFAULT_SIZE.1).max(1);
    (ww, hh)
}

fn parse_sensitivity_arg(args: &[String]) -> f32 {
    args.iter()
        .filter_map(|arg| arg.strip_prefix("--sensitivity="))
        .filter_map(|v| v.parse::<f32>().ok())
        .filter(|s| s.is_finite())
        .last()
        .unwrap_or(DEFAULT_SENSITIVITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_arguments() {
        let cfg = AppConfig::from_args(Vec::<String>::new());
        assert_eq!(cfg.mesh, PathBuf::from(DEFAULT_MESH));
        assert_eq!(cfg.backends, wgpu::Backends::all());
        assert!(!cfg.show_fps);
        assert_eq!((cfg.width, cfg.height), (1280, 720));
        assert_eq!(cfg.sensitivity, 0.01);
    }

    #[test]
    fn positional_path_and_flags() {
        let cfg = AppConfig::from_args([
            "models/teapot.obj",
            "--gpu-backend=GL",
            "--size=800x600",
            "--show-fps",
            "--sensitivity=0.02",
        ]);
        assert_eq!(cfg.mesh, PathBuf::from("models/teapot.obj"));
        assert_eq!(cfg.backends, wgpu::Backends::GL);
        assert!(cfg.show_fps);
        assert_eq!((cfg.width, cfg.height), (800, 600));
        assert_eq!(cfg.sensitivity, 0.02);
    }

    #[test]
    fn mesh_flag_wins_over_positional() {
        let cfg = AppConfig::from_args(["a.obj", "--mesh=b.obj"]);
        assert_eq!(cfg.mesh, PathBuf::from("b.obj"));
    }

    #[test]
    fn bad_values_fall_back() {
        let cfg = AppConfig::from_args([
            "--gpu-backend=glide",
            "--size=wide",
            "--height=0",
            "--show-fps=off",
            "--sensitivity=fast",
        ]);
        assert_eq!(cfg.backends, wgpu::Backends::all());
        assert_eq!((cfg.width, cfg.height), (1280, 1));
        assert!(!cfg.show_fps);
        assert_eq!(cfg.sensitivity, 0.01);
    }
}
