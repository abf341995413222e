//! Bluedroid radio adapter.
//!
//! Implements [`Radio`](crate::ports::Radio) and
//! [`Advertiser`](crate::ports::Advertiser) on top of the ESP-IDF Bluedroid
//! stack. Bluedroid callbacks are C function pointers that cannot capture
//! Rust closures, so statics bridge the callback context to the installed
//! event dispatcher. Host targets use [`sim`](super::sim) instead.

#[cfg(target_os = "espidf")]
pub use esp::{EspAdvertiser, EspRadio, install_dispatcher};

#[cfg(target_os = "espidf")]
mod esp {
    use core::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex, OnceLock};

    use log::{error, info, warn};

    use crate::ble::advertising::AdvertisingSet;
    use crate::ble::events::{EventDispatcher, RadioEvent};
    use crate::ble::{AttrHandle, ConnHandle, RX_CHAR_UUID, SERVICE_UUID, TX_CHAR_UUID};
    use crate::cmd::codec::{MAX_FRAME_LEN, RawFrame};
    use crate::config::DeviceConfig;
    use crate::error::{Error, Result};
    use crate::ports::{AdvertiseError, Advertiser, Radio, RadioError};

    // ── Static bridge state (ISR-safe atomics) ────────────────
    //
    // GATT handles are assigned asynchronously by the registration step
    // machine; the adapter reads them through these atomics.

    static GATTS_IF: AtomicU32 = AtomicU32::new(0);
    static SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
    static RX_HANDLE: AtomicU32 = AtomicU32::new(0);
    static TX_HANDLE: AtomicU32 = AtomicU32::new(0);
    static CHAR_STEP: AtomicU32 = AtomicU32::new(0);

    // Written value staged by the GATTS callback, consumed by the
    // dispatcher through `Radio::read_written` before the callback
    // returns. GATTS callbacks run in the Bluedroid task (not ISR), so
    // std Mutex is safe.
    static WRITE_STAGE: Mutex<Option<(ConnHandle, AttrHandle, Vec<u8>)>> = Mutex::new(None);

    // Peer address → conn_id, for GAP events that only carry the address.
    static CONN_TABLE: Mutex<Vec<([u8; 6], ConnHandle)>> = Mutex::new(Vec::new());

    static DISPATCHER: OnceLock<EventDispatcher<EspRadio>> = OnceLock::new();

    /// Route one lifted event into the installed dispatcher.
    fn dispatch(event: RadioEvent) {
        if let Some(dispatcher) = DISPATCHER.get() {
            dispatcher.on_radio_event(event);
        }
    }

    fn remember_conn(bda: [u8; 6], conn: ConnHandle) {
        if let Ok(mut table) = CONN_TABLE.lock() {
            table.retain(|(_, c)| *c != conn);
            table.push((bda, conn));
        }
    }

    fn forget_conn(conn: ConnHandle) {
        if let Ok(mut table) = CONN_TABLE.lock() {
            table.retain(|(_, c)| *c != conn);
        }
    }

    fn conn_by_bda(bda: &[u8; 6]) -> Option<ConnHandle> {
        CONN_TABLE
            .lock()
            .ok()
            .and_then(|table| table.iter().find(|(a, _)| a == bda).map(|(_, c)| *c))
    }

    fn uuid128_to_esp(uuid: u128) -> esp_idf_svc::sys::esp_bt_uuid_t {
        let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
        t.len = 16;
        unsafe {
            t.uuid.uuid128 = uuid.to_le_bytes();
        }
        t
    }

    unsafe fn add_gatt_char(svc_handle: u16, uuid: u128, perm: u32, prop: u32) {
        use esp_idf_svc::sys::*;
        let mut char_uuid = uuid128_to_esp(uuid);
        unsafe {
            esp_ble_gatts_add_char(
                svc_handle,
                &mut char_uuid,
                perm as esp_gatt_perm_t,
                prop as esp_gatt_char_prop_t,
                core::ptr::null_mut(),
                core::ptr::null_mut(),
            );
        }
    }

    // ── GAP callback ──────────────────────────────────────────

    unsafe extern "C" fn gap_event_handler(
        event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
        param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
    ) {
        use esp_idf_svc::sys::*;
        match event {
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
                info!("RADIO GAP: advertising started");
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
                info!("RADIO GAP: advertising stopped");
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_SEC_REQ_EVT => unsafe {
                esp_ble_gap_security_rsp((*param).ble_security.ble_req.bd_addr.as_mut_ptr(), true);
            },
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_AUTH_CMPL_EVT => {
                let p = unsafe { &(*param).ble_security.auth_cmpl };
                if let Some(handle) = conn_by_bda(&p.bd_addr) {
                    dispatch(RadioEvent::EncryptionUpdated {
                        handle,
                        encrypted: p.success,
                        authenticated: p.auth_mode & ESP_LE_AUTH_REQ_MITM as u8 != 0,
                        bonded: p.auth_mode & ESP_LE_AUTH_BOND as u8 != 0,
                        key_size: 0,
                    });
                } else {
                    warn!("RADIO GAP: auth complete for unknown peer");
                }
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_UPDATE_CONN_PARAMS_EVT => {
                let p = unsafe { &(*param).update_conn_params };
                if let Some(handle) = conn_by_bda(&p.bda) {
                    dispatch(RadioEvent::ConnParamsUpdated {
                        handle,
                        interval: p.conn_int,
                        latency: p.latency,
                        supervision_timeout: p.timeout,
                        status: p.status as u8,
                    });
                }
            }
            other => {
                dispatch(RadioEvent::Unknown { code: other as u16 });
            }
        }
    }

    // ── GATTS callback ────────────────────────────────────────

    unsafe extern "C" fn gatts_event_handler(
        event: esp_idf_svc::sys::esp_gatts_cb_event_t,
        gatts_if: esp_idf_svc::sys::esp_gatt_if_t,
        param: *mut esp_idf_svc::sys::esp_ble_gatts_cb_param_t,
    ) {
        use esp_idf_svc::sys::*;

        GATTS_IF.store(gatts_if as u32, Ordering::Relaxed);

        match event {
            esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
                info!("RADIO GATTS: app registered (if={})", gatts_if);
                let svc_uuid = uuid128_to_esp(SERVICE_UUID);
                let mut svc_id = esp_gatt_srvc_id_t {
                    id: esp_gatt_id_t {
                        uuid: svc_uuid,
                        inst_id: 0,
                    },
                    is_primary: true,
                };
                unsafe {
                    esp_ble_gatts_create_service(gatts_if, &mut svc_id, 8);
                }
            }

            esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
                let p = unsafe { &(*param).create };
                let svc_handle = p.service_handle;
                SVC_HANDLE.store(svc_handle as u32, Ordering::Relaxed);
                info!("RADIO GATTS: service created (handle={})", svc_handle);
                unsafe {
                    esp_ble_gatts_start_service(svc_handle);
                }
                CHAR_STEP.store(1, Ordering::Relaxed);
                unsafe {
                    add_gatt_char(
                        svc_handle,
                        RX_CHAR_UUID,
                        ESP_GATT_PERM_WRITE,
                        ESP_GATT_CHAR_PROP_BIT_WRITE | ESP_GATT_CHAR_PROP_BIT_WRITE_NR,
                    );
                }
            }

            esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
                let p = unsafe { &(*param).add_char };
                let handle = p.attr_handle;
                let svc_handle = SVC_HANDLE.load(Ordering::Relaxed) as u16;
                match CHAR_STEP.load(Ordering::Relaxed) {
                    1 => {
                        RX_HANDLE.store(handle as u32, Ordering::Relaxed);
                        info!("RADIO GATTS: RX char (handle={})", handle);
                        CHAR_STEP.store(2, Ordering::Relaxed);
                        unsafe {
                            add_gatt_char(
                                svc_handle,
                                TX_CHAR_UUID,
                                ESP_GATT_PERM_READ,
                                ESP_GATT_CHAR_PROP_BIT_NOTIFY,
                            );
                        }
                    }
                    2 => {
                        TX_HANDLE.store(handle as u32, Ordering::Relaxed);
                        CHAR_STEP.store(3, Ordering::Relaxed);
                        info!("RADIO GATTS: TX char (handle={}) — all registered", handle);
                    }
                    _ => {}
                }
            }

            esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
                let p = unsafe { &(*param).connect };
                let conn = p.conn_id;
                remember_conn(p.remote_bda, conn);
                dispatch(RadioEvent::Connected {
                    handle: conn,
                    addr_type: p.ble_addr_type as u8,
                    addr: p.remote_bda,
                });
            }

            esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
                let p = unsafe { &(*param).disconnect };
                let conn = p.conn_id;
                forget_conn(conn);
                // Advertising restart is deliberately NOT issued here: the
                // stack forbids reentrant GAP calls from event delivery.
                // The dispatcher arms the flag; the orchestrator restarts.
                dispatch(RadioEvent::Disconnected {
                    handle: conn,
                    reason: p.reason as u8,
                });
            }

            esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
                let p = unsafe { &(*param).write };
                let data = unsafe { core::slice::from_raw_parts(p.value, p.len as usize) };
                if let Ok(mut stage) = WRITE_STAGE.lock() {
                    *stage = Some((p.conn_id, p.handle, data.to_vec()));
                }
                dispatch(RadioEvent::Write {
                    handle: p.conn_id,
                    attr: p.handle,
                });
            }

            esp_gatts_cb_event_t_ESP_GATTS_MTU_EVT => {
                let p = unsafe { &(*param).mtu };
                dispatch(RadioEvent::MtuExchanged {
                    handle: p.conn_id,
                    mtu: p.mtu,
                });
            }

            other => {
                dispatch(RadioEvent::Unknown { code: other as u16 });
            }
        }
    }

    // ── Radio ─────────────────────────────────────────────────

    /// Bluedroid-backed [`Radio`]. Construct once with [`EspRadio::init`].
    pub struct EspRadio(());

    impl EspRadio {
        /// Bring up the Bluedroid stack, register callbacks, and start the
        /// GATT service registration step machine.
        pub fn init(config: &DeviceConfig) -> Result<Arc<Self>> {
            use esp_idf_svc::sys::*;
            unsafe {
                // Release classic BT memory (BLE-only mode saves ~30 KB).
                esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

                let mut bt_cfg = esp_bt_controller_config_t::default();
                if esp_bt_controller_init(&mut bt_cfg) != ESP_OK as i32 {
                    error!("RADIO: bt_controller_init failed");
                    return Err(Error::Radio(RadioError::StackInitFailed));
                }
                if esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE) != ESP_OK as i32 {
                    error!("RADIO: bt_controller_enable failed");
                    return Err(Error::Radio(RadioError::StackInitFailed));
                }
                if esp_bluedroid_init() != ESP_OK as i32 {
                    error!("RADIO: bluedroid_init failed");
                    return Err(Error::Radio(RadioError::StackInitFailed));
                }
                if esp_bluedroid_enable() != ESP_OK as i32 {
                    error!("RADIO: bluedroid_enable failed");
                    return Err(Error::Radio(RadioError::StackInitFailed));
                }

                esp_ble_gap_register_callback(Some(gap_event_handler));
                esp_ble_gatts_register_callback(Some(gatts_event_handler));

                esp_ble_gatt_set_local_mtu(config.preferred_mtu);
                esp_ble_gap_set_device_name(config.device_name.as_ptr().cast());

                esp_ble_gatts_app_register(0);
            }

            info!(
                "RADIO: Bluedroid stack up, registering service {:032x}",
                SERVICE_UUID
            );
            Ok(Arc::new(Self(())))
        }
    }

    impl Radio for EspRadio {
        fn inbound_attr(&self) -> AttrHandle {
            RX_HANDLE.load(Ordering::Relaxed) as AttrHandle
        }

        fn read_written(
            &self,
            conn: ConnHandle,
            attr: AttrHandle,
        ) -> core::result::Result<RawFrame, RadioError> {
            let staged = WRITE_STAGE.lock().ok().and_then(|mut slot| slot.take());
            match staged {
                Some((c, a, bytes)) if c == conn && a == attr => {
                    if bytes.len() > MAX_FRAME_LEN {
                        return Err(RadioError::WriteTooLong);
                    }
                    let mut frame = RawFrame::new();
                    frame
                        .extend_from_slice(&bytes)
                        .map_err(|()| RadioError::WriteTooLong)?;
                    Ok(frame)
                }
                _ => Err(RadioError::NoPendingWrite),
            }
        }

        fn notify(&self, conn: ConnHandle, data: &[u8]) -> core::result::Result<(), RadioError> {
            use esp_idf_svc::sys::*;
            let tx_handle = TX_HANDLE.load(Ordering::Relaxed) as u16;
            if tx_handle == 0 {
                return Err(RadioError::NotifyFailed);
            }
            let err = unsafe {
                esp_ble_gatts_send_indicate(
                    GATTS_IF.load(Ordering::Relaxed) as u8,
                    conn,
                    tx_handle,
                    data.len() as u16,
                    data.as_ptr() as *mut u8,
                    false, // notification, no confirmation
                )
            };
            if err == ESP_OK as i32 {
                Ok(())
            } else {
                Err(RadioError::NotifyFailed)
            }
        }
    }

    /// Install the dispatcher the callbacks route events into. Must be
    /// called exactly once, before any peer connects.
    pub fn install_dispatcher(dispatcher: EventDispatcher<EspRadio>) -> Result<()> {
        DISPATCHER
            .set(dispatcher)
            .map_err(|_| Error::Init("radio dispatcher already installed"))
    }

    // ── Advertiser ────────────────────────────────────────────

    /// Bluedroid-backed [`Advertiser`]. Only driven from the orchestrator
    /// loop, never from callback context.
    pub struct EspAdvertiser(());

    impl EspAdvertiser {
        pub fn new() -> Self {
            Self(())
        }
    }

    impl Advertiser for EspAdvertiser {
        fn start(&mut self, set: &AdvertisingSet) -> core::result::Result<(), AdvertiseError> {
            use esp_idf_svc::sys::*;
            unsafe {
                if esp_ble_gap_config_adv_data_raw(
                    set.adv_data.as_ptr() as *mut u8,
                    set.adv_data.len() as u32,
                ) != ESP_OK as i32
                {
                    return Err(AdvertiseError::StackNotReady);
                }
                if esp_ble_gap_config_scan_rsp_data_raw(
                    set.scan_resp.as_ptr() as *mut u8,
                    set.scan_resp.len() as u32,
                ) != ESP_OK as i32
                {
                    return Err(AdvertiseError::StackNotReady);
                }

                // Interval in 0.625 ms units.
                let interval = (set.interval_ms * 8 / 5).clamp(0x20, 0x4000) as u16;
                let mut adv_params = esp_ble_adv_params_t {
                    adv_int_min: interval,
                    adv_int_max: interval,
                    adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
                    own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
                    channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
                    adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
                    ..core::mem::zeroed()
                };
                if esp_ble_gap_start_advertising(&mut adv_params) != ESP_OK as i32 {
                    return Err(AdvertiseError::StartFailed);
                }
            }
            Ok(())
        }

        fn stop(&mut self) -> core::result::Result<(), AdvertiseError> {
            use esp_idf_svc::sys::*;
            let err = unsafe { esp_ble_gap_stop_advertising() };
            if err == ESP_OK as i32 {
                Ok(())
            } else {
                Err(AdvertiseError::StopFailed)
            }
        }
    }
}
