//! JNI entry points for the Android build.
//!
//! The Java side owns the activity lifecycle. `com.audiolifecycle.LifecycleBridge`
//! forwards `onResume`/`onPause` into a process-wide [`EventLoopHost`] and
//! creates/releases a single process-wide [`AudioDeviceGuard`] bound to it.
//!
//! ```text
//! System.loadLibrary("audio_lifecycle")  -> JNI_OnLoad
//! LifecycleBridge.nativeInit(context)    -> ndk-context for Oboe
//! LifecycleBridge.nativeCreateGuard()    -> guard scheduled on host thread
//! Activity.onResume / onPause            -> nativeOnResume / nativeOnPause
//! LifecycleBridge.nativeReleaseGuard()   -> guard unregistered
//! ```

use std::ffi::c_void;
use std::sync::{Arc, Mutex};

use jni::objects::{GlobalRef, JClass, JObject};
use jni::sys::{jboolean, jint, JNI_FALSE, JNI_TRUE, JNI_VERSION_1_6};
use jni::{JNIEnv, JavaVM};
use log::{error, info, warn};
use once_cell::sync::{Lazy, OnceCell};

use crate::config::AppConfig;
use crate::error::{log_host_error, HostError};
use crate::guard::AudioDeviceGuard;
use crate::host::EventLoopHost;
use crate::logging::init_logging;
use crate::telemetry::{self, LifecycleEvent};

static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::load_android);

static HOST: Lazy<Result<Arc<EventLoopHost>, HostError>> =
    Lazy::new(|| EventLoopHost::spawn(&CONFIG.host));

static GUARD: Mutex<Option<AudioDeviceGuard>> = Mutex::new(None);

/// Application context kept alive for ndk-context.
static ANDROID_CONTEXT: OnceCell<GlobalRef> = OnceCell::new();

/// Whether `nativeInit` has handed the application context to ndk-context.
pub fn context_initialized() -> bool {
    ANDROID_CONTEXT.get().is_some()
}

/// Process-wide host fed by the Java lifecycle callbacks.
pub fn android_host() -> Result<&'static Arc<EventLoopHost>, HostError> {
    (*HOST).as_ref().map_err(Clone::clone)
}

fn to_jboolean(ok: bool) -> jboolean {
    if ok {
        JNI_TRUE
    } else {
        JNI_FALSE
    }
}

/// JNI_OnLoad is called when the native library is loaded by Android
#[no_mangle]
pub extern "system" fn JNI_OnLoad(_vm: JavaVM, _reserved: *mut c_void) -> jint {
    init_logging(&CONFIG.logging);
    info!("JNI_OnLoad called - audio lifecycle library loaded");
    telemetry::hub().record(LifecycleEvent::NativeLibraryLoaded);
    JNI_VERSION_1_6
}

/// Hand the application context to ndk-context so Oboe can reach the audio
/// subsystem. Only the first call has an effect.
#[no_mangle]
pub extern "system" fn Java_com_audiolifecycle_LifecycleBridge_nativeInit<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
    context: JObject<'local>,
) -> jboolean {
    if context_initialized() {
        return JNI_TRUE;
    }

    let vm = match env.get_java_vm() {
        Ok(vm) => vm,
        Err(err) => {
            error!("nativeInit: failed to get JavaVM: {:?}", err);
            return JNI_FALSE;
        }
    };
    let global = match env.new_global_ref(&context) {
        Ok(global) => global,
        Err(err) => {
            error!("nativeInit: failed to pin application context: {:?}", err);
            return JNI_FALSE;
        }
    };

    // SAFETY: both pointers stay valid for the life of the process: the VM is
    // process-wide and the context is pinned by a global ref stored below.
    unsafe {
        ndk_context::initialize_android_context(
            vm.get_java_vm_pointer().cast(),
            global.as_obj().as_raw().cast(),
        );
    }

    if ANDROID_CONTEXT.set(global).is_ok() {
        info!("Android context initialized successfully");
        telemetry::hub().record(LifecycleEvent::AndroidContextInitialized);
    }
    JNI_TRUE
}

#[no_mangle]
pub extern "system" fn Java_com_audiolifecycle_LifecycleBridge_nativeOnResume<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) {
    if let Err(err) = android_host().and_then(|host| host.resume()) {
        log_host_error(&err, "nativeOnResume");
    }
}

#[no_mangle]
pub extern "system" fn Java_com_audiolifecycle_LifecycleBridge_nativeOnPause<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) {
    if let Err(err) = android_host().and_then(|host| host.pause()) {
        log_host_error(&err, "nativeOnPause");
    }
}

/// Create the process-wide guard. Returns false if one already exists or the
/// host is unavailable.
#[no_mangle]
pub extern "system" fn Java_com_audiolifecycle_LifecycleBridge_nativeCreateGuard<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jboolean {
    let mut slot = match GUARD.lock() {
        Ok(slot) => slot,
        Err(_) => {
            error!("nativeCreateGuard: guard lock poisoned");
            return JNI_FALSE;
        }
    };
    if slot.is_some() {
        warn!("nativeCreateGuard: guard already exists");
        return JNI_FALSE;
    }

    let created = android_host()
        .and_then(|host| AudioDeviceGuard::from_config(host, &CONFIG.device));
    match created {
        Ok(guard) => {
            *slot = Some(guard);
            JNI_TRUE
        }
        Err(err) => {
            log_host_error(&err, "nativeCreateGuard");
            JNI_FALSE
        }
    }
}

/// Unregister and drop the process-wide guard. Safe to call repeatedly.
#[no_mangle]
pub extern "system" fn Java_com_audiolifecycle_LifecycleBridge_nativeReleaseGuard<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jboolean {
    let guard = match GUARD.lock() {
        Ok(mut slot) => slot.take(),
        Err(_) => {
            error!("nativeReleaseGuard: guard lock poisoned");
            return JNI_FALSE;
        }
    };
    if let Some(guard) = guard {
        guard.unregister();
    }
    to_jboolean(true)
}
