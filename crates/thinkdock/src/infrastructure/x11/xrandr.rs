//! RandR calls behind [`XrandrSession`].

use std::collections::HashSet;
use std::os::raw::c_int;

use thinkdock_core::provider::{ControllerInfo, ModeInfo, OutputInfo, ResourceSnapshot};
use thinkdock_core::{
    CommitRequest, ConnectionState, ControllerId, Dimensions, DisplayProvider, ModeId, OutputId,
    Point, ProviderError, ScreenSize,
};
use tracing::{debug, info, warn};
use x11::xlib;
use x11::xrandr;

use super::transaction::{apply_transaction, CrtcConfig, RandrOps};
use super::{mode_refresh, preferred_mode, X11Error};

/// An open connection to the X server's root window.
pub struct XrandrSession {
    display: *mut xlib::Display,
    root: xlib::Window,
}

impl XrandrSession {
    /// Connects to the display named by `DISPLAY`.
    ///
    /// # Errors
    ///
    /// Returns [`X11Error::DisplayUnavailable`] if the connection fails.
    pub fn open() -> Result<Self, X11Error> {
        // SAFETY: a null name makes Xlib read `DISPLAY`.  The returned pointer
        // is closed in `Drop`.
        let display = unsafe { xlib::XOpenDisplay(std::ptr::null()) };
        if display.is_null() {
            return Err(X11Error::DisplayUnavailable {
                display: std::env::var("DISPLAY").unwrap_or_else(|_| "<unset>".to_string()),
            });
        }
        // SAFETY: `display` is a valid non-null connection.
        let root = unsafe { xlib::XDefaultRootWindow(display) };
        info!("connected to X server");
        Ok(Self { display, root })
    }

    /// Runs `f` with the current screen resources, freeing them afterwards.
    fn with_resources<T>(
        &self,
        f: impl FnOnce(*mut xrandr::XRRScreenResources) -> Result<T, X11Error>,
    ) -> Result<T, X11Error> {
        // SAFETY: `self.display` and `self.root` stay valid for the session.
        let res = unsafe { xrandr::XRRGetScreenResourcesCurrent(self.display, self.root) };
        if res.is_null() {
            return Err(X11Error::ResourcesUnavailable);
        }
        let result = f(res);
        // SAFETY: `res` came from XRRGetScreenResourcesCurrent and is freed once.
        unsafe { xrandr::XRRFreeScreenResources(res) };
        result
    }

    fn read_snapshot(&self, res: *mut xrandr::XRRScreenResources) -> ResourceSnapshot {
        // SAFETY: `res` is non-null; the arrays it points to hold the stated counts.
        let (raw_modes, raw_outputs, raw_crtcs) = unsafe {
            (
                raw_slice((*res).modes as *const xrandr::XRRModeInfo, (*res).nmode),
                raw_slice((*res).outputs as *const xrandr::RROutput, (*res).noutput),
                raw_slice((*res).crtcs as *const xrandr::RRCrtc, (*res).ncrtc),
            )
        };

        let mut modes = Vec::with_capacity(raw_modes.len());
        for m in raw_modes {
            let Some(refresh) = mode_refresh(m.dotClock as u64, m.hTotal, m.vTotal) else {
                debug!(mode = m.id, "skipping mode with degenerate timing");
                continue;
            };
            // SAFETY: `name` holds `nameLength` bytes, not NUL-terminated.
            let name = unsafe { raw_slice(m.name as *const u8, m.nameLength as c_int) };
            modes.push(ModeInfo {
                id: ModeId(m.id as u64),
                width: m.width,
                height: m.height,
                refresh,
                interlaced: m.modeFlags & xrandr::RR_Interlace as xrandr::XRRModeFlags != 0,
                double_scan: m.modeFlags & xrandr::RR_DoubleScan as xrandr::XRRModeFlags != 0,
                name: String::from_utf8_lossy(name).into_owned(),
            });
        }
        let known_modes: HashSet<ModeId> = modes.iter().map(|m| m.id).collect();

        let mut outputs = Vec::with_capacity(raw_outputs.len());
        for &output in raw_outputs {
            // SAFETY: `output` is listed in `res`.
            let info = unsafe { xrandr::XRRGetOutputInfo(self.display, res, output) };
            if info.is_null() {
                warn!(output, "XRRGetOutputInfo returned nothing, skipping output");
                continue;
            }
            // SAFETY: `info` is non-null until freed below.
            let record = unsafe {
                let i = &*info;
                let listed: Vec<ModeId> = raw_slice(i.modes as *const xrandr::RRMode, i.nmode)
                    .iter()
                    .map(|&m| ModeId(m as u64))
                    .collect();
                let preferred = preferred_mode(&listed, i.npreferred, &known_modes);
                let mode_ids: Vec<ModeId> =
                    listed.into_iter().filter(|m| known_modes.contains(m)).collect();
                OutputInfo {
                    id: OutputId(output as u64),
                    name: String::from_utf8_lossy(raw_slice(i.name as *const u8, i.nameLen))
                        .into_owned(),
                    connection: match i.connection as c_int {
                        c if c == xrandr::RR_Connected as c_int => ConnectionState::Connected,
                        c if c == xrandr::RR_Disconnected as c_int => ConnectionState::Disconnected,
                        _ => ConnectionState::Unknown,
                    },
                    width_mm: i.mm_width as u64,
                    height_mm: i.mm_height as u64,
                    preferred_mode: preferred,
                    modes: mode_ids,
                    controllers: raw_slice(i.crtcs as *const xrandr::RRCrtc, i.ncrtc)
                        .iter()
                        .map(|&c| ControllerId(c as u64))
                        .collect(),
                    controller: (i.crtc != 0).then_some(ControllerId(i.crtc as u64)),
                }
            };
            // SAFETY: freed exactly once.
            unsafe { xrandr::XRRFreeOutputInfo(info) };
            outputs.push(record);
        }

        let mut controllers = Vec::with_capacity(raw_crtcs.len());
        for &crtc in raw_crtcs {
            // SAFETY: `crtc` is listed in `res`.
            let info = unsafe { xrandr::XRRGetCrtcInfo(self.display, res, crtc) };
            if info.is_null() {
                warn!(crtc, "XRRGetCrtcInfo returned nothing, skipping CRTC");
                continue;
            }
            // SAFETY: `info` is non-null until freed below.
            let record = unsafe {
                let i = &*info;
                let mode = ModeId(i.mode as u64);
                ControllerInfo {
                    id: ControllerId(crtc as u64),
                    position: Point::new(i.x, i.y),
                    width: i.width,
                    height: i.height,
                    mode: (i.mode != 0 && known_modes.contains(&mode)).then_some(mode),
                    outputs: raw_slice(i.outputs as *const xrandr::RROutput, i.noutput)
                        .iter()
                        .map(|&o| OutputId(o as u64))
                        .collect(),
                    possible_outputs: raw_slice(i.possible as *const xrandr::RROutput, i.npossible)
                        .iter()
                        .map(|&o| OutputId(o as u64))
                        .collect(),
                }
            };
            // SAFETY: freed exactly once.
            unsafe { xrandr::XRRFreeCrtcInfo(info) };
            controllers.push(record);
        }

        ResourceSnapshot {
            controllers,
            outputs,
            modes,
        }
    }

    fn set_crtc(
        &self,
        res: *mut xrandr::XRRScreenResources,
        config: &CrtcConfig,
    ) -> Result<(), X11Error> {
        let mut raw_outputs: Vec<xrandr::RROutput> =
            config.outputs.iter().map(|o| o.0 as xrandr::RROutput).collect();
        let (mode, outputs_ptr, count) = match config.mode {
            Some(m) if !raw_outputs.is_empty() => (
                m.0 as xrandr::RRMode,
                raw_outputs.as_mut_ptr(),
                raw_outputs.len() as c_int,
            ),
            _ => (0, std::ptr::null_mut(), 0),
        };
        // SAFETY: `res` is valid; `outputs_ptr` points at `count` outputs that
        // outlive the call.
        let status = unsafe {
            xrandr::XRRSetCrtcConfig(
                self.display,
                res,
                config.crtc.0 as xrandr::RRCrtc,
                xlib::CurrentTime,
                config.position.x,
                config.position.y,
                mode,
                xrandr::RR_Rotate_0 as xrandr::Rotation,
                outputs_ptr,
                count,
            )
        };
        if status != xrandr::RRSetConfigSuccess as c_int {
            return Err(X11Error::CrtcConfigFailed {
                crtc: config.crtc.0,
                status,
            });
        }
        Ok(())
    }

    fn crtc_configs(&self, res: *mut xrandr::XRRScreenResources) -> Vec<CrtcConfig> {
        // SAFETY: `res` is non-null; `crtcs` holds `ncrtc` entries.
        let crtcs = unsafe { raw_slice((*res).crtcs as *const xrandr::RRCrtc, (*res).ncrtc) };
        let mut configs = Vec::with_capacity(crtcs.len());
        for &crtc in crtcs {
            // SAFETY: `crtc` is listed in `res`.
            let info = unsafe { xrandr::XRRGetCrtcInfo(self.display, res, crtc) };
            if info.is_null() {
                warn!(crtc, "XRRGetCrtcInfo returned nothing, CRTC will not be restored");
                continue;
            }
            // SAFETY: `info` is non-null until freed below.
            let config = unsafe {
                let i = &*info;
                CrtcConfig {
                    crtc: ControllerId(crtc as u64),
                    position: Point::new(i.x, i.y),
                    width: i.width,
                    height: i.height,
                    mode: (i.mode != 0).then_some(ModeId(i.mode as u64)),
                    outputs: raw_slice(i.outputs as *const xrandr::RROutput, i.noutput)
                        .iter()
                        .map(|&o| OutputId(o as u64))
                        .collect(),
                }
            };
            // SAFETY: freed exactly once.
            unsafe { xrandr::XRRFreeCrtcInfo(info) };
            configs.push(config);
        }
        configs
    }
}

/// The session while the server is grabbed, with one set of resources.
struct GrabbedScreen<'s> {
    session: &'s XrandrSession,
    res: *mut xrandr::XRRScreenResources,
}

impl RandrOps for GrabbedScreen<'_> {
    fn screen(&self) -> ScreenSize {
        let display = self.session.display;
        // SAFETY: an all-zero XWindowAttributes is a valid out-parameter.
        let mut attrs: xlib::XWindowAttributes = unsafe { std::mem::zeroed() };
        // SAFETY: display and root are valid for the session; `attrs` outlives the call.
        let (pixels, millimeters) = unsafe {
            xlib::XGetWindowAttributes(display, self.session.root, &mut attrs);
            let screen = xlib::XDefaultScreen(display);
            (
                Dimensions::new(attrs.width.max(0) as u64, attrs.height.max(0) as u64),
                Dimensions::new(
                    xlib::XDisplayWidthMM(display, screen).max(0) as u64,
                    xlib::XDisplayHeightMM(display, screen).max(0) as u64,
                ),
            )
        };
        ScreenSize { pixels, millimeters }
    }

    fn crtcs(&self) -> Vec<CrtcConfig> {
        self.session.crtc_configs(self.res)
    }

    fn set_screen_size(&mut self, size: ScreenSize) {
        // SAFETY: display and root are valid for the session.
        unsafe {
            xrandr::XRRSetScreenSize(
                self.session.display,
                self.session.root,
                size.pixels.width as c_int,
                size.pixels.height as c_int,
                size.millimeters.width as c_int,
                size.millimeters.height as c_int,
            );
        }
    }

    fn set_crtc(&mut self, config: &CrtcConfig) -> Result<(), X11Error> {
        self.session.set_crtc(self.res, config)
    }

    fn set_primary(&mut self, output: OutputId) {
        // SAFETY: display and root are valid; the output id came from this server.
        unsafe {
            xrandr::XRRSetOutputPrimary(
                self.session.display,
                self.session.root,
                output.0 as xrandr::RROutput,
            );
        }
    }
}

impl DisplayProvider for XrandrSession {
    fn snapshot(&self) -> Result<ResourceSnapshot, ProviderError> {
        Ok(self.with_resources(|res| Ok(self.read_snapshot(res)))?)
    }

    fn apply(&mut self, request: &CommitRequest) -> Result<(), ProviderError> {
        let result = self.with_resources(|res| {
            // SAFETY: display is valid; every grab is paired with an ungrab.
            unsafe { xlib::XGrabServer(self.display) };
            let mut screen = GrabbedScreen { session: self, res };
            let result = apply_transaction(&mut screen, request);
            // SAFETY: as above.
            unsafe {
                xlib::XUngrabServer(self.display);
                xlib::XSync(self.display, xlib::False);
            }
            result
        });
        match &result {
            Ok(()) => info!(
                width = request.screen.pixels.width,
                height = request.screen.pixels.height,
                "XRandR configuration applied"
            ),
            Err(e) => warn!("XRandR configuration failed: {e}"),
        }
        Ok(result?)
    }
}

impl Drop for XrandrSession {
    fn drop(&mut self) {
        // SAFETY: `display` was opened in `open` and is not used after this.
        unsafe { xlib::XCloseDisplay(self.display) };
    }
}

/// Views a C array as a slice; empty for a null pointer or non-positive length.
///
/// # Safety
///
/// When non-null, `ptr` must point at `len` initialised values that outlive `'a`.
unsafe fn raw_slice<'a, T>(ptr: *const T, len: c_int) -> &'a [T] {
    if ptr.is_null() || len <= 0 {
        return &[];
    }
    unsafe { std::slice::from_raw_parts(ptr, len as usize) }
}
